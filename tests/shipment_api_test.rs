// ==========================================
// 运单 API 测试
// ==========================================
// 职责: 验证运单创建、状态覆盖、取消、客户可见性
// ==========================================


#[cfg(test)]
mod shipment_api_test {
    use shipment_tracker::api::{CreateShipmentRequest, UpdateShipmentStatusRequest};
    use shipment_tracker::domain::types::{RoleType, ShipmentStatus};
    use shipment_tracker::repository::ShipmentFilter;
    use shipment_tracker::Caller;

    use crate::test_helpers::{create_test_env, ACTOR, CLIENT_USER_ID};

    fn admin() -> Caller {
        Caller::new(1, vec![RoleType::Admin])
    }

    #[test]
    fn test_create_shipment_records_created_event() {
        let env = create_test_env().unwrap();
        let shipment = env.create_shipment(42.0);
        assert_eq!(shipment.status, ShipmentStatus::Created);
        assert_eq!(shipment.batch_id, None);

        let detail = env
            .state
            .shipment_api
            .get_shipment(shipment.id, &admin())
            .unwrap();
        assert_eq!(detail.events.len(), 1);
        assert_eq!(detail.events[0].event_type, "Created");
        assert_eq!(detail.events[0].actor_user_id, ACTOR);
    }

    #[test]
    fn test_create_shipment_validation() {
        let env = create_test_env().unwrap();
        let mut req = CreateShipmentRequest {
            client_id: env.client_id,
            weight: 0.0,
            volume: None,
            pickup_address: "上海市闵行区莘庄工业区1号".to_string(),
            delivery_address: "Hamburg Speicherstadt Block 7".to_string(),
        };
        let api = &env.state.shipment_api;
        assert_eq!(api.create_shipment(&req, ACTOR).unwrap_err().code(), "VALIDATION_ERROR");

        req.weight = 1.0;
        req.delivery_address = "短地址".to_string();
        assert_eq!(api.create_shipment(&req, ACTOR).unwrap_err().code(), "VALIDATION_ERROR");

        req.delivery_address = "Hamburg Speicherstadt Block 7".to_string();
        req.client_id = 404;
        assert_eq!(
            api.create_shipment(&req, ACTOR).unwrap_err().code(),
            "REFERENCE_NOT_FOUND"
        );
    }

    #[test]
    fn test_update_status_overwrites_any_status() {
        let env = create_test_env().unwrap();
        let shipment = env.create_shipment(5.0);
        let api = &env.state.shipment_api;

        let delivered = UpdateShipmentStatusRequest {
            status: ShipmentStatus::Delivered,
            notes: None,
            location: Some(" Hamburg ".to_string()),
        };
        let updated = api.update_status(shipment.id, &delivered, ACTOR).unwrap();
        assert_eq!(updated.status, ShipmentStatus::Delivered);

        // 状态覆盖不做前置校验
        let back = UpdateShipmentStatusRequest {
            status: ShipmentStatus::InTransit,
            notes: Some("人工更正".to_string()),
            location: None,
        };
        let updated = api.update_status(shipment.id, &back, ACTOR).unwrap();
        assert_eq!(updated.status, ShipmentStatus::InTransit);

        let events = api.get_shipment(shipment.id, &admin()).unwrap().events;
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].event_type, "StatusChanged");
        assert_eq!(events[1].location.as_deref(), Some("Hamburg"));
        assert!(events[1].message.contains("DELIVERED"));
        assert_eq!(events[2].message, "人工更正");
    }

    #[test]
    fn test_update_unknown_shipment_is_not_found() {
        let env = create_test_env().unwrap();
        let req = UpdateShipmentStatusRequest {
            status: ShipmentStatus::Returned,
            notes: None,
            location: None,
        };
        let err = env
            .state
            .shipment_api
            .update_status(777, &req, ACTOR)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_cancel_shipment_rules() {
        let env = create_test_env().unwrap();
        let api = &env.state.shipment_api;
        let shipment = env.create_shipment(5.0);

        let cancelled = api.cancel_shipment(shipment.id, ACTOR).unwrap();
        assert_eq!(cancelled.status, ShipmentStatus::Cancelled);
        assert_eq!(api.cancel_shipment(shipment.id, ACTOR).unwrap_err().code(), "INVALID_STATE");

        // 已取消运单不再出现在未分配池
        assert!(api.list_unassigned().unwrap().is_empty());

        let delivered = env.create_shipment(1.0);
        api.update_status(
            delivered.id,
            &UpdateShipmentStatusRequest {
                status: ShipmentStatus::Delivered,
                notes: None,
                location: None,
            },
            ACTOR,
        )
        .unwrap();
        let err = api.cancel_shipment(delivered.id, ACTOR).unwrap_err();
        match err {
            shipment_tracker::ApiError::InvalidState { current, .. } => {
                assert_eq!(current, "DELIVERED")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_client_sees_only_own_shipments() {
        let env = create_test_env().unwrap();
        let own = env.create_shipment(2.0);
        let other_client = env
            .state
            .master_repo
            .insert_client(6002, "其他客户", "13900000000")
            .unwrap();
        let foreign = env
            .state
            .shipment_api
            .create_shipment(
                &CreateShipmentRequest {
                    client_id: other_client.id,
                    weight: 2.0,
                    volume: None,
                    pickup_address: "深圳市南山区科技园南区".to_string(),
                    delivery_address: "Rotterdam Maasvlakte Plaza 3".to_string(),
                },
                ACTOR,
            )
            .unwrap();

        let client = Caller::new(CLIENT_USER_ID, vec![RoleType::Client]);
        assert!(env.state.shipment_api.get_shipment(own.id, &client).is_ok());
        let err = env
            .state
            .shipment_api
            .get_shipment(foreign.id, &client)
            .unwrap_err();
        assert_eq!(err.http_status(), 403);

        let filtered = env
            .state
            .shipment_api
            .list_shipments(&ShipmentFilter {
                client_id: Some(other_client.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, foreign.id);
    }

    #[test]
    fn test_unknown_carrier_listing_is_not_found() {
        let env = create_test_env().unwrap();
        let err = env
            .state
            .shipment_api
            .list_carrier_shipments(555)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
