// ==========================================
// 物流批次跟踪系统 - 主数据仓储
// ==========================================
// 网点 / 仓库 / 港口 / 承运商 / 客户
// 状态机只依赖存在性校验，写入接口供初始化与测试使用
// ==========================================

use crate::domain::master_data::{Branch, Carrier, Client, Port, Warehouse};
use crate::repository::error::RepositoryResult;
use crate::repository::unit_of_work::{lock_conn, SharedConnection};
use rusqlite::{params, Connection, OptionalExtension};

/// 主数据表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterTable {
    Branch,
    Warehouse,
    Port,
    Carrier,
    Client,
}

impl MasterTable {
    fn table_name(&self) -> &'static str {
        match self {
            MasterTable::Branch => "branch",
            MasterTable::Warehouse => "warehouse",
            MasterTable::Port => "port",
            MasterTable::Carrier => "carrier",
            MasterTable::Client => "client",
        }
    }

    /// 实体名 (用于错误信息)
    pub fn entity_name(&self) -> &'static str {
        match self {
            MasterTable::Branch => "Branch",
            MasterTable::Warehouse => "Warehouse",
            MasterTable::Port => "Port",
            MasterTable::Carrier => "Carrier",
            MasterTable::Client => "Client",
        }
    }
}

// ==========================================
// MasterDataRepository - 主数据仓储
// ==========================================
pub struct MasterDataRepository {
    conn: SharedConnection,
}

impl MasterDataRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 存在性校验
    pub fn exists_tx(tx: &Connection, table: MasterTable, id: i64) -> RepositoryResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ? LIMIT 1", table.table_name());
        let found: Option<i64> = tx.query_row(&sql, params![id], |row| row.get(0)).optional()?;
        Ok(found.is_some())
    }

    pub fn exists(&self, table: MasterTable, id: i64) -> RepositoryResult<bool> {
        let conn = lock_conn(&self.conn)?;
        Self::exists_tx(&conn, table, id)
    }

    // ===== 写入 =====

    pub fn insert_branch(&self, name: &str, address: &str) -> RepositoryResult<Branch> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO branch (name, address) VALUES (?, ?)",
            params![name, address],
        )?;
        Ok(Branch {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            address: address.to_string(),
        })
    }

    pub fn insert_warehouse(&self, name: &str, address: &str) -> RepositoryResult<Warehouse> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO warehouse (name, address) VALUES (?, ?)",
            params![name, address],
        )?;
        Ok(Warehouse {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            address: address.to_string(),
        })
    }

    pub fn insert_port(&self, name: &str, address: &str, country: &str) -> RepositoryResult<Port> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO port (name, address, country) VALUES (?, ?, ?)",
            params![name, address, country],
        )?;
        Ok(Port {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            address: address.to_string(),
            country: country.to_string(),
        })
    }

    pub fn insert_carrier(&self, name: &str, contact_info: &str) -> RepositoryResult<Carrier> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO carrier (name, contact_info) VALUES (?, ?)",
            params![name, contact_info],
        )?;
        Ok(Carrier {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            contact_info: contact_info.to_string(),
        })
    }

    pub fn insert_client(
        &self,
        user_id: i64,
        name: &str,
        phone_number: &str,
    ) -> RepositoryResult<Client> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO client (user_id, name, phone_number) VALUES (?, ?, ?)",
            params![user_id, name, phone_number],
        )?;
        Ok(Client {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            phone_number: phone_number.to_string(),
        })
    }

    // ===== 查询 =====

    /// 按登录用户查询客户档案
    pub fn find_client_by_user_id(&self, user_id: i64) -> RepositoryResult<Option<Client>> {
        let conn = lock_conn(&self.conn)?;
        let client = conn
            .query_row(
                "SELECT id, user_id, name, phone_number FROM client WHERE user_id = ?",
                params![user_id],
                |row| {
                    Ok(Client {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        phone_number: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(client)
    }
}
