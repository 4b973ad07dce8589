pub mod firestore;
pub mod places;
pub mod storage;

pub use firestore::FirestoreExpenseClient;
pub use places::PlacesClient;
pub use storage::LocalStorage;
