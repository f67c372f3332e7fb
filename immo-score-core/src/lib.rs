// immo-score-core/src/lib.rs

// 1. Documentation
#![allow(missing_docs)] // Les sections du rapport sont documentées dans les processeurs

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contrat d'accès à l'entrepôt de données (Warehouse).
pub mod ports;

// 2. Domain (Cœur du métier)
// Périodes, formatage des nombres, seuils, résultat d'extraction.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, fichiers de configuration YAML, écriture JSON atomique.
// Dépend du Domain et des Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// Extracteurs, processeurs, générateur de rapports, utilitaires de reporting.
// Dépend du Domain, de l'Infra et des Ports.
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use immo_score_core::ImmoScoreError;
pub use error::ImmoScoreError;
