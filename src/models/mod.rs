pub mod booking;

pub use booking::{
    Booking, BookingPatch, BookingSearch, BookingStatus, NewBooking, ProviderNote, Relation,
    StatusUpdate,
};
