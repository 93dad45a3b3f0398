pub mod analysis;
pub mod classify;
pub mod cpi;
pub mod ingest;
pub mod pipeline;
pub mod rates;
pub mod raw;
pub mod record;
pub mod season;
pub mod source;
pub mod stats;
pub mod table;
pub mod team;
