use futures::{future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

use crate::dao::{
    models::{SongEntity, StorePush},
    storage::StorageResult,
};

/// Stream of push messages delivered by a live store subscription.
///
/// The stream ends when the underlying connection is lost; the live link
/// reacts by driving its reconnect state machine.
pub type PushStream = BoxStream<'static, StorePush>;

/// Abstraction over the song/vote store consumed by the engine.
///
/// Writes are fire-and-forget from the engine's perspective: their outcome
/// only ever drives local error toasts, never blocks further votes.
pub trait SongStore: Send + Sync {
    /// Open one logical subscription delivering [`StorePush`] messages.
    fn subscribe(&self) -> BoxFuture<'static, StorageResult<PushStream>>;

    /// One-shot read of the top `limit` active songs by vote count, used for
    /// the initial paint before the first push arrives.
    fn top_songs(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>>;

    /// Persist a vote intent as an insert.
    fn record_vote(
        &self,
        song_id: String,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<SongEntity>>;

    /// Insert a new song suggestion and return the stored entity.
    fn suggest_song(
        &self,
        title: String,
        artist: String,
    ) -> BoxFuture<'static, StorageResult<SongEntity>>;

    /// Soft-deactivate a song so it disappears from all later snapshots.
    fn deactivate_song(&self, song_id: String) -> BoxFuture<'static, StorageResult<()>>;

    /// Cheap liveness probe against the store.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
