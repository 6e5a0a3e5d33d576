pub mod club;
pub mod event;
pub mod newsletter;
pub mod submission;
pub mod waitlist;

pub use club::Club;
pub use event::{Event, EventStatus, NewOccurrence, Occurrence, SocialHandles};
pub use newsletter::NewsletterSubscriber;
pub use submission::{EventSubmission, NewEvent, SubmitEventRequest};
pub use waitlist::{WaitlistEntry, WaitlistStats};
