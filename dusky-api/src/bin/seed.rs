// Fills a development database with users, posts, comments and follows.
// Run with: cargo run -p dusky-api --bin seed -- --help

use anyhow::{Context, Result};
use dusky_api::seed::{seed, SeedPlan};
use dusky_shared::auth::password::PasswordParams;
use dusky_shared::db::{migrations, pool};
use rand::{rngs::StdRng, SeedableRng};
use std::env;

#[derive(Debug)]
struct Args {
    plan: SeedPlan,
    rng_seed: Option<u64>,
}

impl Args {
    fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        let mut plan = SeedPlan::default();
        let mut rng_seed = None;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--users" | "-u" => {
                    i += 1;
                    plan.users = parse_value(&args, i, "--users")?;
                }
                "--posts" | "-p" => {
                    i += 1;
                    plan.posts = parse_value(&args, i, "--posts")?;
                }
                "--comments" | "-c" => {
                    i += 1;
                    plan.comments = parse_value(&args, i, "--comments")?;
                }
                "--seed" | "-s" => {
                    i += 1;
                    rng_seed = Some(parse_value(&args, i, "--seed")?);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                arg => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        Ok(Self { plan, rng_seed })
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T> {
    args.get(i)
        .with_context(|| format!("{} requires a value", flag))?
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {}", flag))
}

fn print_help() {
    eprintln!(
        r#"
seed - Fill a development database with sample data

USAGE:
    seed [OPTIONS]

OPTIONS:
    -u, --users <N>       Accounts to create (default: 3)
    -p, --posts <N>       Posts spread across the accounts (default: 200)
    -c, --comments <N>    Comments spread across the posts (default: 100)
    -s, --seed <N>        Seed the random generator for a repeatable run
    -h, --help            Show this help message

ENVIRONMENT:
    DATABASE_URL          PostgreSQL connection string (required)

Every account is active and uses the password "password123".
"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dusky_api=info,dusky_shared=warn".into()),
        )
        .init();

    let args = Args::parse()?;
    let url = env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

    let db = pool::connect(&pool::PoolConfig::new(url))
        .await
        .context("Failed to connect to database")?;
    migrations::run_migrations(db.pool())
        .await
        .context("Failed to run migrations")?;

    let mut rng = match args.rng_seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => StdRng::from_entropy(),
    };

    let report = seed(&db, &args.plan, &PasswordParams::default(), &mut rng)
        .await
        .context("Seeding failed")?;

    for user in &report.users {
        println!("  {} <{}>", user.username, user.email);
    }
    println!(
        "Seeded {} users, {} posts, {} comments, {} follows",
        report.users.len(),
        report.posts,
        report.comments,
        report.follows
    );

    db.close().await;
    Ok(())
}
