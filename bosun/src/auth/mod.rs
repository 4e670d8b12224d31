//! Authentication and authorization.
//!
//! Authentication is stateless: a login issues a JWT that travels either in a
//! session cookie (browser clients) or an `Authorization: Bearer` header
//! (programmatic access). Passwords are hashed with Argon2id.
//!
//! Authorization is vessel-scoped. Handlers extract a [`permissions::VesselCtx`]
//! which resolves the caller's role on the vessel named in the request path and
//! checks it against the static grant table in [`permissions`].
//!
//! # Modules
//!
//! - [`current_user`]: extractor for the authenticated user
//! - [`password`]: password hashing and verification using Argon2
//! - [`permissions`]: grant table and the vessel-scoped context extractor
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
