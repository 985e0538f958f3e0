/// In-process song store used by the binary and the integration tests.
pub mod memory;
/// Entity model shared with the storage collaborator.
pub mod models;
/// Push/write abstraction over the song store.
pub mod song_store;
/// Storage error taxonomy shared by every backend.
pub mod storage;
