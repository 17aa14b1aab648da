// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS HUB (V4.0 - FLEET CONTRACTS)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA INMUTABLE DE ENTIDADES DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTRACT SOVEREIGNTY: Define la gramática que viaja entre los
 *    agentes Android (L1), el plano de control (L3/L4) y el webhook.
 * 2. NOMINAL PURITY: Nomenclatura descriptiva absoluta.
 * 3. ZERO INFRA: Este estrato no conoce HTTP ni SQL; sólo tipos.
 * =================================================================
 */

pub mod alert;
pub mod command;
pub mod deployment;
pub mod device;
pub mod heartbeat;
pub mod partition;
