use std::sync::Arc;

use roost_market::{Marketplace, PgDatabase};

/// The marketplace as the server runs it, pinned to the postgres store
pub type Market = Marketplace<PgDatabase>;

#[derive(Clone)]
pub struct ServerContext {
    pub market: Arc<Market>,
}
