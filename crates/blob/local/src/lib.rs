mod store;

pub use store::LocalBlobStore;
