// ─── InterfaceOficial Core ───
// Version resolution, artifact downloads and launch assembly.
//
// Architecture:
//   core/
//     catalog/     — Version catalog ingestion, OS rules, argument templates
//     resolver/    — Version (+ loader) -> flat artifact manifest
//     maven/       — Maven coordinates for loader libraries
//     downloader/  — Bounded-concurrency fetch with retry, resume and progress
//     assets/      — Asset index expansion into hash-addressed objects
//     launch/      — Launch parameter builder, native extraction, process sink
//     auth/        — Identity record + provider
//     state/       — Persisted settings, histories and download stats
//     coordinator  — Resolve -> fetch -> build -> spawn

pub mod assets;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod downloader;
pub mod error;
pub mod http;
pub mod launch;
pub mod maven;
pub mod resolver;
pub mod state;
