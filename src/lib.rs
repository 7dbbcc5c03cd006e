//! EmbedHub: connect GitHub or Google Drive, pick text content, and store
//! its embeddings in a vector database, one namespace per resource.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit (sauf chargement sqlite-vec)
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
// Les types doivent suivre la convention CamelCase (exception explicite possible au besoin)

// Options supplémentaires pour ne rien laisser passer
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)] // Les noms de variables et fonctions doivent être en snake_case
#![deny(non_upper_case_globals)] // Les constantes et globals doivent être en MAJUSCULE
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]
// Interdit l'utilisation d'unsafe même dans une fonction unsafe

// Clippy pour stricte discipline
#![deny(clippy::all)] // Active toutes les lints Clippy standard
#![deny(clippy::pedantic)] // Active les lints très strictes de Clippy
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::unwrap_in_result)] // Interdit unwrap() sur Result
#![deny(clippy::module_inception)] // Interdit un module ayant le même nom que le crate
#![deny(clippy::redundant_clone)] // Interdit les clones inutiles
#![deny(clippy::too_many_arguments)] // Limite le nombre d’arguments des fonctions
#![deny(clippy::cognitive_complexity)] // Limite la complexité cognitive des fonctions
// Les tests peuvent unwrap()
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)] // Interdit les littéraux qui débordent

/// OAuth sign-in, sessions and the session sweeper.
pub mod auth;
/// Configuration, errors, identifiers and providers.
pub mod core;
/// Embedding backends (OpenAI-compatible, Ollama).
#[allow(clippy::doc_markdown)]
pub mod embedding;
/// Chunking, namespaces and the chunk, embed, upsert pipeline.
pub mod ingest;
/// HTTP server and API routes.
#[allow(
    clippy::missing_errors_doc,
    clippy::unused_async,
    clippy::needless_pass_by_value
)]
pub mod server;
/// GitHub and Google Drive clients, scrapers and archives.
#[allow(clippy::doc_markdown, clippy::too_many_lines, clippy::similar_names)]
pub mod sources;
/// Vector stores (Pinecone, `SQLite` + sqlite-vec).
pub mod storage;
/// Entry helpers to start the EmbedHub server.
pub mod start_embedhub;
