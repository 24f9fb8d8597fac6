mod cache;
mod config;
mod reads;
mod writes;
