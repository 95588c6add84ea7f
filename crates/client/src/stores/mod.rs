//! Client-side observable state.
//!
//! Stores wrap FileManager and durable storage calls with load/error
//! bookkeeping:
//! - `UserStore` - current user, remembered across sessions
//! - `RulesetStore` - rulesets and modules
//! - `ArchetypeStore` - archetype choice per ruleset
//! - `OnboardingSeenStore` / `OnboardingTracker` / `OnboardingStatus` - onboarding flags

pub mod archetype;
pub mod notifications;
pub mod onboarding;
pub mod resource;
pub mod rulesets;
pub mod user;

pub use archetype::ArchetypeStore;
pub use notifications::{Notification, NotificationLevel, Notifier};
pub use onboarding::{OnboardingSeenStore, OnboardingStatus, OnboardingTracker, OnboardingView};
pub use resource::{FetchOutcome, LoadStatus, Resource, ResourceState};
pub use rulesets::{RulesetCollection, RulesetStore};
pub use user::UserStore;
