pub mod pagination;
pub mod search_cache;

use std::sync::Arc;

use chrono::Utc;
use teloxide::types::{ChatId, MessageId};

use crate::{
    database::{Database, Movie},
    error::{Error, Result},
};
use pagination::PAGE_SIZE;
use search_cache::SearchCache;

/// Shorter queries are refused before they get here.
pub const MIN_QUERY_LEN: usize = 3;

/// How many results a chat search fetches to page through.
pub const CHAT_SEARCH_LIMIT: u32 = 20;

/// How many results a panel search fetches to page through.
pub const PANEL_SEARCH_LIMIT: u32 = 200;

pub struct Catalog {
    db: Arc<Database>,
    cache: SearchCache<(String, u32), Vec<Movie>>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Catalog {
        Catalog {
            db,
            cache: SearchCache::default(),
        }
    }

    /// True if `query` is long enough to be worth searching for.
    pub fn query_is_searchable(query: &str) -> bool {
        query.trim().chars().count() >= MIN_QUERY_LEN
    }

    /// Movies whose title contains `query`, ignoring case, in the order they
    /// were added. At most `limit` of them.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Arc<Vec<Movie>>> {
        self.cache
            .get_or_fetch((query.to_string(), limit), || async {
                self.db.search_movies(query, limit).await
            })
            .await
            .map_err(Error::from)
    }

    /// How many movies match `query` in all, however many a search is
    /// limited to.
    pub async fn count_matches(&self, query: &str) -> Result<i64> {
        Ok(self.db.count_movies_matching(query).await?)
    }

    /// Register a channel post as a movie.
    pub async fn add(
        &self,
        title: &str,
        channel_id: ChatId,
        message_id: MessageId,
    ) -> Result<Movie> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::validation("the movie needs a title"));
        }

        let movie = self
            .db
            .insert_movie(title, channel_id, message_id, Utc::now())
            .await?;

        // Before returning, so the caller's next search already sees it.
        self.cache.invalidate_all().await;

        log::info!(
            "Added movie {} {:?} from {}/{}",
            movie.movie_id,
            movie.title,
            movie.channel_id,
            movie.message_id.0
        );
        Ok(movie)
    }

    pub async fn get(&self, movie_id: i64) -> Result<Movie> {
        self.db
            .get_movie(movie_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("movie {movie_id}")))
    }

    /// Page `index` (0-based) of the whole catalog, alphabetically, along
    /// with the total amount of movies.
    pub async fn list(&self, index: usize) -> Result<(Vec<Movie>, i64)> {
        let offset = i64::try_from(index.saturating_mul(PAGE_SIZE)).unwrap_or(i64::MAX);
        #[allow(clippy::cast_possible_wrap)]
        let movies = self.db.list_movies(offset, PAGE_SIZE as i64).await?;
        Ok((movies, self.db.count_movies().await?))
    }
}
