// ==========================================
// 承运商分配测试
// ==========================================
// 职责: 验证分配清单全部成功或全部回滚
// ==========================================


#[cfg(test)]
mod carrier_assignment_test {
    use shipment_tracker::domain::types::{BatchStatus, ShipmentStatus};
    use shipment_tracker::engine::CarrierAssignment;

    use crate::test_helpers::{create_test_env, TestEnv, ACTOR};

    fn ready_batch(env: &TestEnv, weights: &[f64]) -> (i64, Vec<i64>) {
        let (batch_id, ids) = env.open_batch_with("分配批次", weights);
        env.advance_to_destination_warehouse(batch_id);
        (batch_id, ids)
    }

    fn events_of(env: &TestEnv, shipment_id: i64) -> Vec<String> {
        let caller = shipment_tracker::Caller::new(
            1,
            vec![shipment_tracker::domain::types::RoleType::Admin],
        );
        env.state
            .shipment_api
            .get_shipment(shipment_id, &caller)
            .unwrap()
            .events
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[test]
    fn test_assign_all_rows() {
        let env = create_test_env().unwrap();
        let (batch_id, ids) = ready_batch(&env, &[10.0, 20.0]);

        let detail = env
            .state
            .batch_api
            .assign_carriers(
                batch_id,
                &[
                    CarrierAssignment {
                        shipment_id: ids[0],
                        carrier_id: env.carrier_ids[0],
                    },
                    CarrierAssignment {
                        shipment_id: ids[1],
                        carrier_id: env.carrier_ids[1],
                    },
                ],
                ACTOR,
            )
            .unwrap();

        assert_eq!(detail.view.batch.status, BatchStatus::AssignedToCarriers);
        assert!(detail.view.batch.carrier_assigned_at.is_some());
        for (shipment, carrier) in detail.shipments.iter().zip(env.carrier_ids.iter()) {
            assert_eq!(shipment.carrier_id, Some(*carrier));
            assert_eq!(shipment.status, ShipmentStatus::WithCarrier);
        }
        assert!(events_of(&env, ids[0]).contains(&"CarrierAssigned".to_string()));

        let carrier_view = env
            .state
            .shipment_api
            .list_carrier_shipments(env.carrier_ids[1])
            .unwrap();
        assert_eq!(carrier_view.len(), 1);
        assert_eq!(carrier_view[0].id, ids[1]);
    }

    #[test]
    fn test_missing_carrier_rolls_back_every_row() {
        let env = create_test_env().unwrap();
        let (batch_id, ids) = ready_batch(&env, &[10.0, 20.0]);
        let before = env.state.batch_api.get_batch(batch_id).unwrap();

        let err = env
            .state
            .batch_api
            .assign_carriers(
                batch_id,
                &[
                    CarrierAssignment {
                        shipment_id: ids[0],
                        carrier_id: env.carrier_ids[0],
                    },
                    CarrierAssignment {
                        shipment_id: ids[1],
                        carrier_id: 9999,
                    },
                ],
                ACTOR,
            )
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("9999"));

        let after = env.state.batch_api.get_batch(batch_id).unwrap();
        assert_eq!(after.view.batch.status, BatchStatus::InDestinationWarehouse);
        assert_eq!(after.view.batch.revision, before.view.batch.revision);
        assert_eq!(after.view.batch.carrier_assigned_at, None);
        for shipment in &after.shipments {
            assert_eq!(shipment.carrier_id, None);
            assert_ne!(shipment.status, ShipmentStatus::WithCarrier);
        }
        assert!(!events_of(&env, ids[0]).contains(&"CarrierAssigned".to_string()));
    }

    #[test]
    fn test_foreign_shipment_rejected() {
        let env = create_test_env().unwrap();
        let (batch_id, ids) = ready_batch(&env, &[10.0]);
        let stray = env.create_shipment(3.0);

        let err = env
            .state
            .batch_api
            .assign_carriers(
                batch_id,
                &[
                    CarrierAssignment {
                        shipment_id: ids[0],
                        carrier_id: env.carrier_ids[0],
                    },
                    CarrierAssignment {
                        shipment_id: stray.id,
                        carrier_id: env.carrier_ids[0],
                    },
                ],
                ACTOR,
            )
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let after = env.state.batch_api.get_batch(batch_id).unwrap();
        assert_eq!(after.shipments[0].carrier_id, None);
    }

    #[test]
    fn test_empty_and_duplicate_lists_rejected() {
        let env = create_test_env().unwrap();
        let (batch_id, ids) = ready_batch(&env, &[10.0]);

        let err = env
            .state
            .batch_api
            .assign_carriers(batch_id, &[], ACTOR)
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let row = CarrierAssignment {
            shipment_id: ids[0],
            carrier_id: env.carrier_ids[0],
        };
        let err = env
            .state
            .batch_api
            .assign_carriers(batch_id, &[row, row], ACTOR)
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_wrong_batch_status_checked_first() {
        let env = create_test_env().unwrap();
        let (batch_id, ids) = env.open_batch_with("未到目的仓批次", &[1.0]);

        let err = env
            .state
            .batch_api
            .assign_carriers(
                batch_id,
                &[CarrierAssignment {
                    shipment_id: ids[0],
                    carrier_id: 9999,
                }],
                ACTOR,
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }
}
