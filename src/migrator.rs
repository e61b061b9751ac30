use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_quotations_tables::Migration),
            Box::new(m20240601_000002_create_orders_tables::Migration),
            Box::new(m20240601_000003_create_work_orders_tables::Migration),
            Box::new(m20240601_000004_create_shipments_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_quotations_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_quotations_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Quotations::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Quotations::QuotationNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Quotations::CustomerName).string().not_null())
                        .col(ColumnDef::new(Quotations::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Quotations::CompanyName).string().null())
                        .col(ColumnDef::new(Quotations::Phone).string().null())
                        .col(ColumnDef::new(Quotations::Status).string().not_null())
                        .col(
                            ColumnDef::new(Quotations::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TaxAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotations::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Quotations::Currency).string().not_null())
                        .col(ColumnDef::new(Quotations::Notes).text().null())
                        .col(
                            ColumnDef::new(Quotations::ValidUntil)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Quotations::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(Quotations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotations_status")
                        .table(Quotations::Table)
                        .col(Quotations::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuotationItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuotationItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuotationItems::QuotationId).uuid().not_null())
                        .col(ColumnDef::new(QuotationItems::ProductName).string().not_null())
                        .col(ColumnDef::new(QuotationItems::Specification).json().null())
                        .col(ColumnDef::new(QuotationItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(QuotationItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(QuotationItems::LineTotal).decimal().not_null())
                        .col(
                            ColumnDef::new(QuotationItems::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(QuotationItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotation_items_quotation_id")
                                .from(QuotationItems::Table, QuotationItems::QuotationId)
                                .to(Quotations::Table, Quotations::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotation_items_quotation_id")
                        .table(QuotationItems::Table)
                        .col(QuotationItems::QuotationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuotationItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Quotations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Quotations {
        Table,
        Id,
        QuotationNumber,
        CustomerName,
        CustomerEmail,
        CompanyName,
        Phone,
        Status,
        Subtotal,
        TaxAmount,
        TotalAmount,
        Currency,
        Notes,
        ValidUntil,
        OrderId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum QuotationItems {
        Table,
        Id,
        QuotationId,
        ProductName,
        Specification,
        Quantity,
        UnitPrice,
        LineTotal,
        Position,
        CreatedAt,
    }
}

mod m20240601_000002_create_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::QuotationId).uuid().null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CompanyName).string().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::TaxAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::ShippingAddress).text().null())
                        .col(ColumnDef::new(Orders::RequestedDeliveryDate).date().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Specification).json().null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::LineTotal).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::FromStatus).string().null())
                        .col(ColumnDef::new(OrderStatusHistory::ToStatus).string().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::Reason).text().null())
                        .col(ColumnDef::new(OrderStatusHistory::ChangedBy).string().null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_status_history_order_id")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_status_history_order_id")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        QuotationId,
        CustomerName,
        CustomerEmail,
        CompanyName,
        Status,
        Subtotal,
        TaxAmount,
        TotalAmount,
        Currency,
        Notes,
        ShippingAddress,
        RequestedDeliveryDate,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductName,
        Specification,
        Quantity,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        FromStatus,
        ToStatus,
        Reason,
        ChangedBy,
        CreatedAt,
    }
}

mod m20240601_000003_create_work_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_work_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::WorkOrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WorkOrders::CurrentStage).string().not_null())
                        .col(ColumnDef::new(WorkOrders::Status).string().not_null())
                        .col(ColumnDef::new(WorkOrders::Priority).string().not_null())
                        .col(ColumnDef::new(WorkOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(WorkOrders::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_order_id")
                                .from(WorkOrders::Table, WorkOrders::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderStages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrderStages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderStages::WorkOrderId).uuid().not_null())
                        .col(ColumnDef::new(WorkOrderStages::Stage).string().not_null())
                        .col(ColumnDef::new(WorkOrderStages::Sequence).integer().not_null())
                        .col(ColumnDef::new(WorkOrderStages::Status).string().not_null())
                        .col(ColumnDef::new(WorkOrderStages::AssignedTo).string().null())
                        .col(ColumnDef::new(WorkOrderStages::Notes).text().null())
                        .col(
                            ColumnDef::new(WorkOrderStages::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderStages::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrderStages::CompletedBy).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_stages_work_order_id")
                                .from(WorkOrderStages::Table, WorkOrderStages::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_order_stages_work_order_stage")
                        .table(WorkOrderStages::Table)
                        .col(WorkOrderStages::WorkOrderId)
                        .col(WorkOrderStages::Stage)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderActions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrderActions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderActions::WorkOrderId).uuid().not_null())
                        .col(ColumnDef::new(WorkOrderActions::Stage).string().not_null())
                        .col(ColumnDef::new(WorkOrderActions::Action).string().not_null())
                        .col(ColumnDef::new(WorkOrderActions::PerformedBy).string().null())
                        .col(ColumnDef::new(WorkOrderActions::Detail).text().null())
                        .col(
                            ColumnDef::new(WorkOrderActions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_actions_work_order_id")
                                .from(WorkOrderActions::Table, WorkOrderActions::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_order_actions_work_order_id")
                        .table(WorkOrderActions::Table)
                        .col(WorkOrderActions::WorkOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrderActions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrderStages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        WorkOrderNumber,
        OrderId,
        CurrentStage,
        Status,
        Priority,
        Notes,
        StartedAt,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrderStages {
        Table,
        Id,
        WorkOrderId,
        Stage,
        Sequence,
        Status,
        AssignedTo,
        Notes,
        StartedAt,
        CompletedAt,
        CompletedBy,
    }

    #[derive(DeriveIden)]
    enum WorkOrderActions {
        Table,
        Id,
        WorkOrderId,
        Stage,
        Action,
        PerformedBy,
        Detail,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }
}

mod m20240601_000004_create_shipments_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_shipments_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::Carrier).string().not_null())
                        .col(ColumnDef::new(Shipments::ServiceType).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::TrackingNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Shipments::TrackingUrl).string().not_null())
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(ColumnDef::new(Shipments::Notes).text().null())
                        .col(
                            ColumnDef::new(Shipments::ShippedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::EstimatedDelivery)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::LastCheckedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_order_id")
                                .from(Shipments::Table, Shipments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_order_id")
                        .table(Shipments::Table)
                        .col(Shipments::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentTrackingEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentTrackingEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentTrackingEvents::ShipmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentTrackingEvents::Status)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentTrackingEvents::Location).string().null())
                        .col(ColumnDef::new(ShipmentTrackingEvents::Description).text().null())
                        .col(
                            ColumnDef::new(ShipmentTrackingEvents::EventTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentTrackingEvents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipment_tracking_events_shipment_id")
                                .from(
                                    ShipmentTrackingEvents::Table,
                                    ShipmentTrackingEvents::ShipmentId,
                                )
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_tracking_events_shipment_id")
                        .table(ShipmentTrackingEvents::Table)
                        .col(ShipmentTrackingEvents::ShipmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentTrackingEvents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        OrderId,
        Carrier,
        ServiceType,
        TrackingNumber,
        TrackingUrl,
        Status,
        Notes,
        ShippedAt,
        EstimatedDelivery,
        DeliveredAt,
        LastCheckedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ShipmentTrackingEvents {
        Table,
        Id,
        ShipmentId,
        Status,
        Location,
        Description,
        EventTime,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }
}
