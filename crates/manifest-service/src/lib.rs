//! 设施清单规则服务
//!
//! 通过 REST API 管理清单规则，并根据设施事实集评估出对应的清单。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义及 HTTP 映射
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由与中间件配置
//! - `seed`: 启动时加载规则文件
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod seed;
pub mod state;

pub use dto::{ApiResponse, EvaluateQuery, EvaluateResponse, RuleDto, RuleRequest};
pub use error::{ApiError, Result};
pub use state::AppState;

/// 服务名称，用于配置文件查找和日志标识
pub const SERVICE_NAME: &str = "manifest-service";
