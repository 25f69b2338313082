/// Database models for Dusky
///
/// # Models
///
/// - `user`: User accounts (inactive until activation)
/// - `invitation`: Pending activation invitations (token hash only)
/// - `post`: Posts with optimistic-concurrency versioning
/// - `comment`: Comments on posts
/// - `follower`: Follow relationships between users
/// - `feed`: Paginated, filtered view over followed users' posts
///
/// # Example
///
/// ```no_run
/// use dusky_shared::db::Database;
/// use dusky_shared::models::post::Post;
///
/// # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
/// if let Some(post) = Post::find_by_id(&db, 1).await? {
///     println!("{} (v{})", post.title, post.version);
/// }
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod feed;
pub mod follower;
pub mod invitation;
pub mod post;
pub mod user;
