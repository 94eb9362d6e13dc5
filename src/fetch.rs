//! Complete collection retrieval.
//!
//! A single `get` returns at most one page of results, so whole tables are
//! walked in windows of consecutive identifiers. Each window is requested page
//! by page until the server stops reporting `more`, then the window slides
//! forward. The walk ends once as many rows were collected as `dbstats`
//! reports for the table.
//!
//! Throttling replies pause the walk for the server-provided `fullwait` and
//! repeat the same request; any other error reply aborts the run.
use std::{fmt, net::TcpStream, str::FromStr, thread, time::Duration};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::ClientConfig,
    protocol::{
        Connection, GetOptions, IdFilter, PageReply, Record, ServerError, Session, SessionError,
        Stats,
    },
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown entity type '{0}'")]
    UnknownType(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("dbstats reply has no '{0}' total")]
    MissingStat(&'static str),
    #[error("server rejected {entity} query: {error}")]
    Rejected {
        entity: EntityType,
        error: ServerError,
    },
    #[error("malformed {entity} reply: {reason}")]
    Malformed { entity: EntityType, reason: String },
    #[error("{entity} window starting at {index} (page {page}) returned no rows")]
    Stalled {
        entity: EntityType,
        index: u64,
        page: u32,
    },
}

/// Tables reachable through `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Vn,
    Release,
    Producer,
    Character,
    Staff,
    User,
    VoteList,
    VnList,
    WishList,
}

impl EntityType {
    pub const ALL: [EntityType; 9] = [
        EntityType::Vn,
        EntityType::Release,
        EntityType::Producer,
        EntityType::Character,
        EntityType::Staff,
        EntityType::User,
        EntityType::VoteList,
        EntityType::VnList,
        EntityType::WishList,
    ];

    /// Name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            EntityType::Vn => "vn",
            EntityType::Release => "release",
            EntityType::Producer => "producer",
            EntityType::Character => "character",
            EntityType::Staff => "staff",
            EntityType::User => "user",
            EntityType::VoteList => "votelist",
            EntityType::VnList => "vnlist",
            EntityType::WishList => "wishlist",
        }
    }

    /// Field the identifier windows filter and sort on.
    pub fn id_field(self) -> &'static str {
        match self {
            EntityType::VoteList | EntityType::VnList | EntityType::WishList => "uid",
            _ => "id",
        }
    }

    /// Key of the `dbstats` total bounding the walk.
    pub fn stats_key(self) -> &'static str {
        match self {
            EntityType::Vn => "vn",
            EntityType::Release => "releases",
            EntityType::Producer => "producers",
            EntityType::Character => "chars",
            EntityType::Staff => "staff",
            EntityType::User
            | EntityType::VoteList
            | EntityType::VnList
            | EntityType::WishList => "users",
        }
    }

    /// Results per page, which is also the identifier window width.
    pub fn page_size(self) -> u64 {
        if self.name().ends_with("list") {
            100
        } else {
            25
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|entity| entity.name() == s)
            .ok_or_else(|| FetchError::UnknownType(s.to_string()))
    }
}

/// Blocks the run while the server throttles it.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Walks a table to completion over one session.
pub struct Fetcher<'a, C: Connection, S: Sleep> {
    session: &'a mut Session<C>,
    sleep: S,
}

impl<'a, C: Connection, S: Sleep> Fetcher<'a, C, S> {
    pub fn new(session: &'a mut Session<C>, sleep: S) -> Self {
        Self { session, sleep }
    }

    /// Reads the table total from `dbstats`, then collects every row.
    pub fn fetch(&mut self, entity: EntityType, flags: &str) -> Result<Vec<Record>, FetchError> {
        let stats = self.session.db_stats()?;
        let total = stats
            .total(entity.stats_key())
            .ok_or(FetchError::MissingStat(entity.stats_key()))?;
        self.fetch_total(entity, flags, total)
    }

    /// Collects rows until `total` have been received.
    pub fn fetch_total(
        &mut self,
        entity: EntityType,
        flags: &str,
        total: u64,
    ) -> Result<Vec<Record>, FetchError> {
        let field = entity.id_field();
        let results = entity.page_size();

        let mut items = Vec::new();
        let mut count = 0;
        let mut index = 1;
        let mut page = 1;

        while count < total {
            let filter = IdFilter {
                field,
                start: index,
                len: results,
            };
            let options = GetOptions {
                page,
                results,
                sort: field.to_string(),
            };

            let reply = self
                .session
                .get(entity.name(), flags, &filter.to_string(), options)?;
            let result = match reply {
                PageReply::Error(error) if error.is_throttled() => {
                    let wait = error.wait().ok_or_else(|| FetchError::Malformed {
                        entity,
                        reason: format!(
                            "throttled without a usable fullwait: {:?}",
                            error.fullwait
                        ),
                    })?;
                    warn!("throttled, retrying in {:.1}s", wait.as_secs_f64());
                    self.sleep.sleep(wait);
                    continue;
                }
                PageReply::Error(error) => return Err(FetchError::Rejected { entity, error }),
                PageReply::Page(result) => result,
            };

            if result.num == 0 && !result.more {
                return Err(FetchError::Stalled {
                    entity,
                    index,
                    page,
                });
            }

            debug!(
                "{entity} {field} {index}..{} page {page}: {} rows, more={}",
                index + results,
                result.num,
                result.more
            );
            count += result.num;
            items.extend(result.items);

            if result.more {
                page += 1;
            } else {
                index += results;
                page = 1;
            }
        }

        info!("collected {count} of {total} {entity} rows");
        Ok(items)
    }
}

fn connect(config: &ClientConfig) -> Result<Session<TcpStream>, FetchError> {
    let mut session = Session::open(config)?;
    let status = session.login()?;
    info!("login: {status}");
    Ok(session)
}

/// Fetches the server's table totals over a fresh session.
pub fn fetch_stats(config: &ClientConfig) -> Result<Stats, FetchError> {
    let mut session = connect(config)?;
    let stats = session.db_stats()?;
    session.close()?;
    Ok(stats)
}

/// Fetches every row of `entity` over a fresh session.
///
/// The connection is shut down on every path; nothing collected before a
/// failure is returned.
pub fn fetch_entity(
    config: &ClientConfig,
    entity: EntityType,
    flags: &str,
) -> Result<Vec<Record>, FetchError> {
    let mut session = connect(config)?;
    let items = Fetcher::new(&mut session, ThreadSleep).fetch(entity, flags)?;
    session.close()?;
    Ok(items)
}
