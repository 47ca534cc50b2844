// ==========================================
// 物流批次跟踪系统 - 主数据
// ==========================================
// 网点 / 仓库 / 港口 / 承运商 / 客户
// 简单记录存储，状态机只校验其存在性
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: i64,
    pub name: String,
    pub contact_info: String,
}

/// 客户 (关联登录用户)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone_number: String,
}
