mod repository;

pub use repository::MemoryMediaRepository;
