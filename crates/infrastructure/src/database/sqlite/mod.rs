pub mod sqlite_node_client_repository;
pub mod sqlite_run_repository;
pub mod sqlite_run_sample_repository;

pub use sqlite_node_client_repository::SqliteNodeClientRepository;
pub use sqlite_run_repository::SqliteRunRepository;
pub use sqlite_run_sample_repository::SqliteRunSampleRepository;
