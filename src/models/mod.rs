pub mod area;
pub mod availability;
pub mod booking;
pub mod client;
pub mod timestamp;
pub mod tutor;

pub use area::Area;
pub use availability::{Availability, OpenSlot};
pub use booking::{Booking, BookingStatus, BookingWithClient};
pub use client::{Client, ClientDetails};
pub use tutor::{Tutor, TutorDetail};
