// Readbot Engine — WhatsApp session supervision and the status dashboard.
// Backend events flow one way: webhook → supervisor → shared state → dashboard.

pub mod config;
pub mod state;
pub mod whatsapp;
pub mod dashboard;
