use super::*;

#[test]
fn decodes_dispatch_payload_from_server_json() {
    let raw = r#"{
        "pendingOrders": [
            {"id": 2, "vendor": {"id": 7, "name": "Green Farm", "currentBalance": 1200.5},
             "orderDate": "2024-05-01", "assignedUnits": 150, "status": "PENDING"}
        ],
        "plannedTrips": [
            {"id": 1, "tripDate": "2024-05-01", "status": "PLANNED",
             "driver": {"id": 3, "name": "Ravi", "username": "ravi", "password": "hash"},
             "routeName": "North County Run", "loadedWeight": 1000.0,
             "orders": [
                {"id": 1, "vendor": {"id": 8, "name": "Hill Poultry"},
                 "orderDate": "2024-05-01", "assignedUnits": 90, "status": "ASSIGNED"}
             ]}
        ]
    }"#;

    let data: DispatchData = serde_json::from_str(raw).expect("decode dispatch data");
    assert_eq!(data.pending_orders.len(), 1);
    assert_eq!(data.pending_orders[0].id, OrderId(2));
    assert_eq!(data.pending_orders[0].vendor.name, "Green Farm");
    assert_eq!(data.pending_orders[0].trip, None);

    let trip = &data.planned_trips[0];
    assert_eq!(trip.id, TripId(1));
    assert_eq!(trip.driver.name, "Ravi");
    assert_eq!(trip.order_ids(), vec![OrderId(1)]);
    assert_eq!(trip.orders[0].status, OrderStatus::Assigned);
    assert_eq!(
        trip.trip_date,
        Some(NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"))
    );
}

#[test]
fn trip_without_orders_decodes_as_empty_lane() {
    let raw = r#"{"id": 4, "driver": {"id": 3, "name": "Ravi"}, "routeName": "East", "orders": []}"#;
    let trip: Trip = serde_json::from_str(raw).expect("decode trip");
    assert!(trip.orders.is_empty());

    let raw = r#"{"id": 5, "driver": {"id": 3, "name": "Ravi"}, "routeName": "West"}"#;
    let trip: Trip = serde_json::from_str(raw).expect("decode trip without orders key");
    assert!(trip.orders.is_empty());
}

#[test]
fn assign_request_uses_camel_case_and_bare_ids() {
    let request = AssignOrdersRequest {
        trip_id: TripId(2),
        order_ids: vec![OrderId(10), OrderId(11)],
    };
    let value = serde_json::to_value(&request).expect("encode");
    assert_eq!(
        value,
        serde_json::json!({"tripId": 2, "orderIds": [10, 11]})
    );
}

#[test]
fn create_trip_request_omits_missing_weight_and_formats_date() {
    let request = CreateTripRequest {
        route_name: "North County Run".to_string(),
        driver_id: DriverId(3),
        trip_date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
        loaded_weight: None,
    };
    let value = serde_json::to_value(&request).expect("encode");
    assert_eq!(
        value,
        serde_json::json!({"routeName": "North County Run", "driverId": 3, "tripDate": "2024-05-01"})
    );
}

#[test]
fn create_order_requires_positive_units() {
    let mut request = CreateOrderRequest {
        vendor_id: VendorId(7),
        assigned_units: 0,
        order_date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
    };
    let err = request.validate().expect_err("zero units rejected");
    assert_eq!(err.code, ErrorCode::Validation);

    request.assigned_units = 150;
    request.validate().expect("positive units accepted");
}

#[test]
fn create_trip_requires_route_name_and_sane_weight() {
    let mut request = CreateTripRequest {
        route_name: "   ".to_string(),
        driver_id: DriverId(3),
        trip_date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
        loaded_weight: Some(1000.0),
    };
    assert!(request.validate().is_err());

    request.route_name = "North".to_string();
    request.validate().expect("valid trip");

    request.loaded_weight = Some(-1.0);
    assert!(request.validate().is_err());

    request.loaded_weight = Some(f64::NAN);
    assert!(request.validate().is_err());
}

#[test]
fn update_order_details_rejects_empty_and_negative_payloads() {
    assert!(UpdateOrderDetailsRequest::default().validate().is_err());

    let negative = UpdateOrderDetailsRequest {
        delivered_units: Some(-3),
        ..Default::default()
    };
    assert!(negative.validate().is_err());

    let ok = UpdateOrderDetailsRequest {
        delivered_units: Some(140),
        payment_amount: Some(5000.0),
        weight: None,
    };
    ok.validate().expect("valid details");
    assert_eq!(
        serde_json::to_value(&ok).expect("encode"),
        serde_json::json!({"deliveredUnits": 140, "paymentAmount": 5000.0})
    );
}
