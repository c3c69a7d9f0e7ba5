pub mod booking_model;
pub mod movie_model;
pub mod show_model;
pub mod theatre_model;

pub const MOVIES: &str = "movies";
pub const THEATRES: &str = "theatres";
pub const SHOWS: &str = "shows";
pub const BOOKINGS: &str = "bookings";
