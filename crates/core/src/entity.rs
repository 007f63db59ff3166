/// A record with a stable identity: accounts, vouchers, professionals,
/// warranties, claims and reviews. Stores key their tables by `id()`.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
