// [libs/infra/db/src/repositories/user.rs]
/*!
 * =================================================================
 * APARATO: OPERATOR REPOSITORY (V3.0 - JWT MINTING SUPPORT)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LECTURA DE OPERADORES PARA LA EMISIÓN DE JWT
 *
 * El CRUD genérico de operadores queda fuera del alcance del plano de
 * control; este repositorio existe sólo para autenticar el login.
 * =================================================================
 */

use crate::errors::DbError;
use crate::PgClient;
use chrono::{DateTime, Utc};
use sqlx::Row;

/// Operador administrativo con credenciales de acceso.
#[derive(Debug, Clone)]
pub struct OperatorAccount {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserRepository {
    database_client: PgClient,
}

impl UserRepository {
    #[must_use]
    pub fn new(database_client: PgClient) -> Self {
        Self { database_client }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<OperatorAccount>, DbError> {
        let account_row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.database_client.pool())
        .await?;

        account_row
            .map(|row| {
                let map_fault = |fault: sqlx::Error| DbError::MappingError(format!("OPERATOR_ROW_DECODE: {}", fault));
                Ok(OperatorAccount {
                    id: row.try_get("id").map_err(map_fault)?,
                    username: row.try_get("username").map_err(map_fault)?,
                    email: row.try_get("email").map_err(map_fault)?,
                    password_hash: row.try_get("password_hash").map_err(map_fault)?,
                    created_at: row.try_get("created_at").map_err(map_fault)?,
                })
            })
            .transpose()
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/user.rs]
