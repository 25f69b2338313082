/// Development data seeding
///
/// Fills a database with activated users, posts, comments and follows,
/// going through the same account and content operations the API uses.
/// Driven by the `seed` binary.

use chrono::Duration;
use dusky_shared::{
    accounts::{self, NewAccount},
    auth::password::PasswordParams,
    db::Database,
    error::{DomainError, DomainResult},
    models::{
        comment::Comment,
        follower::Follower,
        post::{CreatePost, Post},
        user::User,
    },
};
use rand::{seq::SliceRandom, Rng};

const NAMES: &[&str] = &["alice", "bob", "charlie", "dave", "eve", "frank"];

const TAGS: &[&str] = &["intro", "news", "rust", "music", "travel", "food"];

const REMARKS: &[&str] = &[
    "Great post!",
    "Thanks for sharing.",
    "I disagree, but nicely argued.",
    "Following for more.",
];

/// How much data to create
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,

    /// Password set on every seeded account
    pub password: String,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            users: 3,
            posts: 200,
            comments: 100,
            password: "password123".to_string(),
        }
    }
}

/// What a seed run created
#[derive(Debug)]
pub struct SeedReport {
    pub users: Vec<User>,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

/// Seeds `db` according to `plan`
///
/// `rng` decides how content is spread across accounts. Usernames carry a
/// suffix drawn independently of it, so repeated runs against one database
/// do not collide even with the same generator seed.
pub async fn seed<R: Rng>(
    db: &Database,
    plan: &SeedPlan,
    params: &PasswordParams,
    rng: &mut R,
) -> DomainResult<SeedReport> {
    if plan.users == 0 {
        return Err(DomainError::Validation("At least one user is required".to_string()));
    }

    let mut users = Vec::with_capacity(plan.users);
    for i in 0..plan.users {
        let username = format!("{}{}_{:08x}", NAMES[i % NAMES.len()], i + 1, rand::random::<u32>());
        let (_, token) = accounts::register_and_invite(
            db,
            NewAccount {
                email: format!("{}@example.com", username),
                username,
                password: plan.password.clone(),
            },
            Duration::hours(24),
            params,
        )
        .await?;
        users.push(accounts::activate(db, token.expose()).await?);
    }
    tracing::info!(count = users.len(), "Seeded users");

    let mut post_ids = Vec::with_capacity(plan.posts);
    for i in 0..plan.posts {
        let author = &users[rng.gen_range(0..users.len())];
        let tags = TAGS
            .choose_multiple(rng, 2)
            .map(|t| t.to_string())
            .collect();

        let post = Post::create(
            db,
            CreatePost {
                title: format!("Post Title {}", i + 1),
                content: format!("This is the content of post {}.", i + 1),
                author_id: author.id,
                tags,
            },
        )
        .await?;
        post_ids.push(post.id);
    }
    tracing::info!(count = post_ids.len(), "Seeded posts");

    let mut comments = 0;
    if !post_ids.is_empty() {
        for _ in 0..plan.comments {
            let post_id = post_ids[rng.gen_range(0..post_ids.len())];
            let author = &users[rng.gen_range(0..users.len())];
            let remark = REMARKS[rng.gen_range(0..REMARKS.len())];

            Comment::create(db, post_id, author.id, remark.to_string()).await?;
            comments += 1;
        }
    }
    tracing::info!(count = comments, "Seeded comments");

    let mut follows = 0;
    for follower in &users {
        for followed in &users {
            if follower.id == followed.id || !rng.gen_bool(0.5) {
                continue;
            }
            Follower::follow(db, followed.id, follower.id).await?;
            follows += 1;
        }
    }
    tracing::info!(count = follows, "Seeded follows");

    Ok(SeedReport {
        users,
        posts: post_ids.len(),
        comments,
        follows,
    })
}
