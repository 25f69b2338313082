/// Email templates
///
/// Rendered with plain string formatting. Interpolated values are HTML-escaped.

use super::OutboundEmail;

/// Invitation email carrying the activation link
pub fn invitation(username: &str, email: &str, activation_url: &str) -> OutboundEmail {
    let username_html = escape_html(username);
    let url_html = escape_html(activation_url);

    let html_body = format!(
        r#"<!doctype html>
<html>
  <body>
    <p>Hi {username_html},</p>
    <p>Thanks for signing up for Dusky. Confirm your email to activate your account:</p>
    <p><a href="{url_html}">{url_html}</a></p>
    <p>The link expires soon. If you did not sign up, you can ignore this email.</p>
    <p>The Dusky Team</p>
  </body>
</html>
"#
    );

    OutboundEmail {
        to_name: username.to_string(),
        to_email: email.to_string(),
        subject: "Finish registration with Dusky".to_string(),
        html_body,
    }
}

/// Builds the activation link sent in invitation emails
///
/// The link opens the web client's confirm page, not this API; the client
/// redeems the token with `PUT /v1/users/activate/:token`.
pub fn activation_url(frontend_url: &str, token: &str) -> String {
    format!("{}/auth/confirm?token={}", frontend_url.trim_end_matches('/'), token)
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
