// ==========================================
// 物流批次跟踪系统 - 批次仓储
// ==========================================
// 对齐: schema batch 表
// 红线: Repository 不含业务逻辑
// 并发: 更新走 revision 乐观锁 (UPDATE ... WHERE id = ? AND revision = ?)
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_ts, parse_enum, parse_opt_ts, parse_ts};
use crate::repository::unit_of_work::{lock_conn, SharedConnection};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

const BATCH_COLUMNS: &str = "id, branch_id, name, status, shipment_count, total_weight, \
     threshold_count, threshold_weight, source_warehouse_id, destination_warehouse_id, \
     source_port_id, destination_port_id, carrier_assigned_at, revision, created_at, updated_at";

/// 批次列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub branch_id: Option<i64>,
    pub status: Option<BatchStatus>,
}

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
pub struct BatchRepository {
    conn: SharedConnection,
}

impl BatchRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 列表查询 (最新创建在前)
    pub fn list(&self, filter: &BatchFilter) -> RepositoryResult<Vec<Batch>> {
        let conn = lock_conn(&self.conn)?;

        let mut sql = format!("SELECT {} FROM batch WHERE 1 = 1", BATCH_COLUMNS);
        let mut values: Vec<&dyn ToSql> = Vec::new();
        let status_str = filter.status.map(|s| s.to_db_str());

        if let Some(branch_id) = filter.branch_id.as_ref() {
            sql.push_str(" AND branch_id = ?");
            values.push(branch_id);
        }
        if let Some(status) = status_str.as_ref() {
            sql.push_str(" AND status = ?");
            values.push(status);
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(values.as_slice(), Self::map_row)?
            .collect::<Result<Vec<Batch>, _>>()?;
        Ok(batches)
    }

    // ==========================================
    // 事务内操作 (tx 可为 Transaction 或普通 Connection)
    // ==========================================

    pub fn insert_tx(tx: &Connection, batch: &mut Batch) -> RepositoryResult<i64> {
        tx.execute(
            r#"INSERT INTO batch (
                branch_id, name, status, shipment_count, total_weight,
                threshold_count, threshold_weight, source_warehouse_id, destination_warehouse_id,
                source_port_id, destination_port_id, carrier_assigned_at, revision,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                batch.branch_id,
                &batch.name,
                batch.status.to_db_str(),
                batch.shipment_count,
                batch.total_weight,
                batch.threshold_count,
                batch.threshold_weight,
                batch.source_warehouse_id,
                batch.destination_warehouse_id,
                batch.source_port_id,
                batch.destination_port_id,
                batch.carrier_assigned_at.as_ref().map(format_ts),
                batch.revision,
                format_ts(&batch.created_at),
                format_ts(&batch.updated_at),
            ],
        )?;
        batch.id = tx.last_insert_rowid();
        Ok(batch.id)
    }

    pub fn find_by_id_tx(tx: &Connection, id: i64) -> RepositoryResult<Option<Batch>> {
        let sql = format!("SELECT {} FROM batch WHERE id = ?", BATCH_COLUMNS);
        let batch = tx
            .query_row(&sql, params![id], Self::map_row)
            .optional()?;
        Ok(batch)
    }

    /// 更新批次 (带乐观锁检查)
    ///
    /// 成功后 `batch.revision` 同步加 1
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配 (已被并发修改)
    /// - `RepositoryError::NotFound`: id 不存在
    pub fn update_tx(tx: &Connection, batch: &mut Batch) -> RepositoryResult<()> {
        let rows_affected = tx.execute(
            r#"UPDATE batch
               SET name = ?, status = ?, shipment_count = ?, total_weight = ?,
                   source_warehouse_id = ?, destination_warehouse_id = ?,
                   source_port_id = ?, destination_port_id = ?, carrier_assigned_at = ?,
                   updated_at = ?, revision = revision + 1
               WHERE id = ? AND revision = ?"#,
            params![
                &batch.name,
                batch.status.to_db_str(),
                batch.shipment_count,
                batch.total_weight,
                batch.source_warehouse_id,
                batch.destination_warehouse_id,
                batch.source_port_id,
                batch.destination_port_id,
                batch.carrier_assigned_at.as_ref().map(format_ts),
                format_ts(&batch.updated_at),
                batch.id,
                batch.revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是 revision 冲突
            let actual: Option<i32> = tx
                .query_row(
                    "SELECT revision FROM batch WHERE id = ?",
                    params![batch.id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    entity: "Batch".to_string(),
                    id: batch.id,
                    expected: batch.revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::not_found("Batch", batch.id)),
            };
        }

        batch.revision += 1;
        Ok(())
    }

    /// 映射数据库行到 Batch
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Batch> {
        let status: String = row.get(3)?;
        Ok(Batch {
            id: row.get(0)?,
            branch_id: row.get(1)?,
            name: row.get(2)?,
            status: parse_enum(3, &status, BatchStatus::from_db_str)?,
            shipment_count: row.get(4)?,
            total_weight: row.get(5)?,
            threshold_count: row.get(6)?,
            threshold_weight: row.get(7)?,
            source_warehouse_id: row.get(8)?,
            destination_warehouse_id: row.get(9)?,
            source_port_id: row.get(10)?,
            destination_port_id: row.get(11)?,
            carrier_assigned_at: parse_opt_ts(12, row.get(12)?)?,
            revision: row.get(13)?,
            created_at: parse_ts(14, &row.get::<_, String>(14)?)?,
            updated_at: parse_ts(15, &row.get::<_, String>(15)?)?,
        })
    }
}
