// ==========================================
// 物流批次跟踪系统 - 运单仓储
// ==========================================
// 对齐: schema shipment 表
// 并发: 更新走 revision 乐观锁
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_ts, parse_enum, parse_ts};
use crate::repository::unit_of_work::{lock_conn, SharedConnection};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

const SHIPMENT_COLUMNS: &str = "id, client_id, batch_id, status, weight, volume, \
     pickup_address, delivery_address, carrier_id, revision, created_at, updated_at";

/// 运单列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    pub client_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub status: Option<ShipmentStatus>,
}

// ==========================================
// ShipmentRepository - 运单仓储
// ==========================================
pub struct ShipmentRepository {
    conn: SharedConnection,
}

impl ShipmentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Shipment>> {
        let conn = lock_conn(&self.conn)?;
        Self::find_by_id_tx(&conn, id)
    }

    /// 列表查询 (最新创建在前)
    pub fn list(&self, filter: &ShipmentFilter) -> RepositoryResult<Vec<Shipment>> {
        let conn = lock_conn(&self.conn)?;

        let mut sql = format!("SELECT {} FROM shipment WHERE 1 = 1", SHIPMENT_COLUMNS);
        let mut values: Vec<&dyn ToSql> = Vec::new();
        let status_str = filter.status.map(|s| s.to_db_str());

        if let Some(client_id) = filter.client_id.as_ref() {
            sql.push_str(" AND client_id = ?");
            values.push(client_id);
        }
        if let Some(batch_id) = filter.batch_id.as_ref() {
            sql.push_str(" AND batch_id = ?");
            values.push(batch_id);
        }
        if let Some(status) = status_str.as_ref() {
            sql.push_str(" AND status = ?");
            values.push(status);
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(values.as_slice(), Self::map_row)?
            .collect::<Result<Vec<Shipment>, _>>()?;
        Ok(shipments)
    }

    /// 未入批且未取消的运单 (先到先入)
    pub fn list_unassigned(&self) -> RepositoryResult<Vec<Shipment>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM shipment WHERE batch_id IS NULL AND status <> ? ORDER BY created_at ASC, id ASC",
            SHIPMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params![ShipmentStatus::Cancelled.to_db_str()], Self::map_row)?
            .collect::<Result<Vec<Shipment>, _>>()?;
        Ok(shipments)
    }

    /// 指派给承运商的运单
    pub fn list_by_carrier(&self, carrier_id: i64) -> RepositoryResult<Vec<Shipment>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM shipment WHERE carrier_id = ? ORDER BY updated_at DESC, id DESC",
            SHIPMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map(params![carrier_id], Self::map_row)?
            .collect::<Result<Vec<Shipment>, _>>()?;
        Ok(shipments)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn insert_tx(tx: &Connection, shipment: &mut Shipment) -> RepositoryResult<i64> {
        tx.execute(
            r#"INSERT INTO shipment (
                client_id, batch_id, status, weight, volume,
                pickup_address, delivery_address, carrier_id, revision,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                shipment.client_id,
                shipment.batch_id,
                shipment.status.to_db_str(),
                shipment.weight,
                shipment.volume,
                &shipment.pickup_address,
                &shipment.delivery_address,
                shipment.carrier_id,
                shipment.revision,
                format_ts(&shipment.created_at),
                format_ts(&shipment.updated_at),
            ],
        )?;
        shipment.id = tx.last_insert_rowid();
        Ok(shipment.id)
    }

    pub fn find_by_id_tx(tx: &Connection, id: i64) -> RepositoryResult<Option<Shipment>> {
        let sql = format!("SELECT {} FROM shipment WHERE id = ?", SHIPMENT_COLUMNS);
        let shipment = tx
            .query_row(&sql, params![id], Self::map_row)
            .optional()?;
        Ok(shipment)
    }

    /// 批次成员 (按 id 升序)
    pub fn find_by_batch_tx(tx: &Connection, batch_id: i64) -> RepositoryResult<Vec<Shipment>> {
        let sql = format!(
            "SELECT {} FROM shipment WHERE batch_id = ? ORDER BY id ASC",
            SHIPMENT_COLUMNS
        );
        let mut stmt = tx.prepare(&sql)?;
        let shipments = stmt
            .query_map(params![batch_id], Self::map_row)?
            .collect::<Result<Vec<Shipment>, _>>()?;
        Ok(shipments)
    }

    /// 更新运单 (带乐观锁检查)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: id 不存在
    pub fn update_tx(tx: &Connection, shipment: &mut Shipment) -> RepositoryResult<()> {
        let rows_affected = tx.execute(
            r#"UPDATE shipment
               SET batch_id = ?, status = ?, carrier_id = ?, updated_at = ?,
                   revision = revision + 1
               WHERE id = ? AND revision = ?"#,
            params![
                shipment.batch_id,
                shipment.status.to_db_str(),
                shipment.carrier_id,
                format_ts(&shipment.updated_at),
                shipment.id,
                shipment.revision,
            ],
        )?;

        if rows_affected == 0 {
            let actual: Option<i32> = tx
                .query_row(
                    "SELECT revision FROM shipment WHERE id = ?",
                    params![shipment.id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    entity: "Shipment".to_string(),
                    id: shipment.id,
                    expected: shipment.revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::not_found("Shipment", shipment.id)),
            };
        }

        shipment.revision += 1;
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Shipment> {
        let status: String = row.get(3)?;
        Ok(Shipment {
            id: row.get(0)?,
            client_id: row.get(1)?,
            batch_id: row.get(2)?,
            status: parse_enum(3, &status, ShipmentStatus::from_db_str)?,
            weight: row.get(4)?,
            volume: row.get(5)?,
            pickup_address: row.get(6)?,
            delivery_address: row.get(7)?,
            carrier_id: row.get(8)?,
            revision: row.get(9)?,
            created_at: parse_ts(10, &row.get::<_, String>(10)?)?,
            updated_at: parse_ts(11, &row.get::<_, String>(11)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use std::sync::{Arc, Mutex};

    fn setup() -> (SharedConnection, ShipmentRepository) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO client (id, user_id, name, phone_number) VALUES (1, 100, 'Acme', '555-0100');
             INSERT INTO carrier (id, name, contact_info) VALUES (1, 'FastWay', 'ops@fastway');",
        )
        .unwrap();
        let shared = Arc::new(Mutex::new(conn));
        (shared.clone(), ShipmentRepository::new(shared))
    }

    fn new_shipment(weight: f64) -> Shipment {
        Shipment::new(1, weight, Some(0.5), "Pickup Street 10".into(), "Delivery Road 20".into())
    }

    #[test]
    fn test_insert_find_update() {
        let (conn, repo) = setup();
        let mut s = new_shipment(4.25);
        {
            let guard = conn.lock().unwrap();
            ShipmentRepository::insert_tx(&guard, &mut s).unwrap();
        }

        let mut loaded = repo.find_by_id(s.id).unwrap().unwrap();
        assert_eq!(loaded.weight, 4.25);
        assert_eq!(loaded.volume, Some(0.5));
        assert_eq!(loaded.status, ShipmentStatus::Created);

        loaded.status = ShipmentStatus::WithCarrier;
        loaded.carrier_id = Some(1);
        {
            let guard = conn.lock().unwrap();
            ShipmentRepository::update_tx(&guard, &mut loaded).unwrap();
        }
        let reloaded = repo.find_by_id(s.id).unwrap().unwrap();
        assert_eq!(reloaded.carrier_id, Some(1));
        assert_eq!(reloaded.revision, 1);
        assert_eq!(repo.list_by_carrier(1).unwrap().len(), 1);
    }

    #[test]
    fn test_stale_update_rejected() {
        let (conn, _repo) = setup();
        let guard = conn.lock().unwrap();
        let mut s = new_shipment(1.0);
        ShipmentRepository::insert_tx(&guard, &mut s).unwrap();
        let mut stale = s.clone();

        s.status = ShipmentStatus::Cancelled;
        ShipmentRepository::update_tx(&guard, &mut s).unwrap();

        stale.status = ShipmentStatus::Delivered;
        let err = ShipmentRepository::update_tx(&guard, &mut stale).unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
    }

    #[test]
    fn test_unassigned_excludes_cancelled() {
        let (conn, repo) = setup();
        {
            let guard = conn.lock().unwrap();
            let mut a = new_shipment(1.0);
            let mut b = new_shipment(2.0);
            b.status = ShipmentStatus::Cancelled;
            ShipmentRepository::insert_tx(&guard, &mut a).unwrap();
            ShipmentRepository::insert_tx(&guard, &mut b).unwrap();
        }
        let pool = repo.list_unassigned().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].weight, 1.0);

        let cancelled = repo
            .list(&ShipmentFilter {
                status: Some(ShipmentStatus::Cancelled),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cancelled.len(), 1);
    }
}
