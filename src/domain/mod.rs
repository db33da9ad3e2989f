pub mod address;
pub mod identity;
pub mod pubkey;
pub mod records;


pub use address::{AddressDeriver, SeedAddressDeriver};
pub use identity::IdentityTracker;
pub use pubkey::Pubkey;
pub use records::{LikeRecord, PostKey, PostRecord, UserAccount};
