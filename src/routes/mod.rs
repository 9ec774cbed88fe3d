/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod contact;
pub mod health;
pub mod posts;
