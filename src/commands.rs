//! Command entry points, one `impl App` block per lifecycle area.
//!
//! - [`fetch`]: fetch a pull request (or all of them) into local branches
//! - [`update`]: bring update-branch changes into a request branch, with
//!   conflict suspension and continuation
//! - [`merge`]: merge a request branch into the update branch
//! - [`close`]: close a request and delete its local branch
//! - [`submit`]: push the current branch and open a pull request for it
//! - [`show`]: listings, browser opening, pulling remote changes

pub mod close;
pub mod fetch;
pub mod merge;
pub mod show;
pub mod submit;
pub mod update;
