pub mod listener;

#[cfg(test)]
mod tests;

pub use listener::SubscriptionSet;
