// ==========================================
// HTTP 接口测试
// ==========================================
// 职责: 验证路由、身份提取、角色校验、错误码映射
// ==========================================


#[cfg(test)]
mod http_api_test {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use shipment_tracker::router;

    use crate::test_helpers::{create_test_env, TestEnv, CLIENT_USER_ID};

    fn app(env: &TestEnv) -> Router {
        router(env.state.clone())
    }

    async fn call(
        app: Router,
        method: Method,
        uri: &str,
        roles: Option<(i64, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user_id, roles)) = roles {
            builder = builder
                .header("X-User-Id", user_id.to_string())
                .header("X-User-Roles", roles);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let env = create_test_env().unwrap();
        let response = app(&env)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_missing_identity_is_forbidden() {
        let env = create_test_env().unwrap();
        let (status, body) = call(app(&env), Method::GET, "/api/batches", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("FORBIDDEN"));
    }

    #[tokio::test]
    async fn test_role_table_enforced() {
        let env = create_test_env().unwrap();
        let batch_id = env.open_batch("角色批次");

        // 港口操作员不能封批
        let (status, _) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/close", batch_id),
            Some((7, "PortOperator")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // 录入员可以封批，空批次返回 400
        let (status, body) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/close", batch_id),
            Some((7, "DataEntry")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_STATE"));
    }

    #[tokio::test]
    async fn test_create_batch_and_add_shipment_over_http() {
        let env = create_test_env().unwrap();
        let (status, body) = call(
            app(&env),
            Method::POST,
            "/api/batches",
            Some((3, "BranchAdmin")),
            Some(json!({
                "branch_id": env.branch_id,
                "name": "HTTP 批次",
                "threshold_count": 5,
                "threshold_weight": 500.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("DRAFT"));
        let batch_id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/open", batch_id),
            Some((3, "BranchAdmin")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let shipment = env.create_shipment(12.5);
        let (status, body) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/shipments", batch_id),
            Some((3, "DataEntry")),
            Some(json!({ "shipment_id": shipment.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["shipment_count"], json!(1));
        assert_eq!(body["data"]["total_weight"], json!(12.5));

        let (status, body) = call(
            app(&env),
            Method::GET,
            &format!("/api/batches/{}", batch_id),
            Some((3, "DataEntry")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["shipments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_and_reference_errors() {
        let env = create_test_env().unwrap();
        let (status, body) = call(
            app(&env),
            Method::GET,
            "/api/batches/99999",
            Some((1, "Admin")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], json!("NOT_FOUND"));

        let (batch_id, _) = env.open_batch_with("引用批次", &[1.0]);
        env.state.batch_api.close_batch(batch_id, None).unwrap();
        let (status, body) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/move-to-warehouse", batch_id),
            Some((9, "WarehouseOperator")),
            Some(json!({ "warehouse_id": 424242 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("REFERENCE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_validation_error() {
        let env = create_test_env().unwrap();
        let (status, body) = call(
            app(&env),
            Method::GET,
            "/api/batches?status=SHIPPED",
            Some((1, "DataEntry")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_malformed_request_is_structured_validation_error() {
        let env = create_test_env().unwrap();
        let batch_id = env.open_batch("格式批次");

        // 缺少 shipment_id 字段
        let (status, body) = call(
            app(&env),
            Method::POST,
            &format!("/api/batches/{}/shipments", batch_id),
            Some((3, "BranchAdmin")),
            Some(json!({ "shipment": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert!(body["message"].as_str().unwrap().contains("shipment_id"));

        // 字段类型错误
        let (status, body) = call(
            app(&env),
            Method::POST,
            "/api/shipments",
            Some((3, "Admin")),
            Some(json!({
                "client_id": env.client_id,
                "weight": "heavy",
                "pickup_address": "上海市闵行区莘庄工业区1号",
                "delivery_address": "Hamburg Speicherstadt Block 7"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));

        // 非数字路径参数
        let (status, body) = call(
            app(&env),
            Method::GET,
            "/api/batches/abc",
            Some((3, "Admin")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));

        // 非数字查询参数
        let (status, body) = call(
            app(&env),
            Method::GET,
            "/api/batches?branch_id=main",
            Some((3, "Admin")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));

        // 批次未被修改
        let detail = env.state.batch_api.get_batch(batch_id).unwrap();
        assert_eq!(detail.view.batch.shipment_count, 0);
    }

    #[tokio::test]
    async fn test_client_shipment_visibility_over_http() {
        let env = create_test_env().unwrap();
        let shipment = env.create_shipment(8.0);

        let (status, body) = call(
            app(&env),
            Method::GET,
            &format!("/api/shipments/{}", shipment.id),
            Some((CLIENT_USER_ID, "Client")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);

        let (status, _) = call(
            app(&env),
            Method::GET,
            &format!("/api/shipments/{}", shipment.id),
            Some((CLIENT_USER_ID + 1, "Client")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_carrier_operator_updates_status() {
        let env = create_test_env().unwrap();
        let shipment = env.create_shipment(8.0);

        let (status, body) = call(
            app(&env),
            Method::PUT,
            &format!("/api/shipments/{}/status", shipment.id),
            Some((11, "CarrierOperator")),
            Some(json!({ "status": "OUT_FOR_DELIVERY", "location": "Altona" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("OUT_FOR_DELIVERY"));

        let (status, _) = call(
            app(&env),
            Method::POST,
            &format!("/api/shipments/{}/cancel", shipment.id),
            Some((11, "CarrierOperator")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
