//! PostgreSQL persistence for the boilingseed engine.

pub mod postgres;

pub use postgres::PostgresRepository;

pub use boilingseed_seed::Repository;
