use keymint_storage::ShardedUrlRepository;
use typed_builder::TypedBuilder;

#[derive(Clone, TypedBuilder)]
pub struct AppState {
    /// Prefix-routed repository used by the lookup path.
    #[builder]
    pub lookup: ShardedUrlRepository,
    /// Round-robin-routed repository used to claim inventory slots.
    #[builder]
    pub assign: ShardedUrlRepository,
    /// Base URL under which short keys are served.
    #[builder]
    pub base_url: String,
}
