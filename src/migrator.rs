use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_cmr_deliveries_table::Migration),
            Box::new(m20240601_000002_create_ack_productions_table::Migration),
            Box::new(m20240601_000003_create_lorry_freight_table::Migration),
        ]
    }
}

mod m20240601_000001_create_cmr_deliveries_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_cmr_deliveries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CmrDeliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CmrDeliveries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CmrDeliveries::UserId).uuid().not_null())
                        .col(ColumnDef::new(CmrDeliveries::AckNumber).string().not_null())
                        .col(ColumnDef::new(CmrDeliveries::DeliveryDate).date().not_null())
                        .col(
                            ColumnDef::new(CmrDeliveries::DestinationPool)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::Variety)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::CmrQuantityQtls)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::PaddyConsumedQtls)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::VehicleNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::DriverName)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::DeliveryStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::GateInStatus)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(CmrDeliveries::GateInDate).date().null())
                        .col(
                            ColumnDef::new(CmrDeliveries::DumpingStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CmrDeliveries::DumpingDate).date().null())
                        .col(ColumnDef::new(CmrDeliveries::Season).string().not_null())
                        .col(ColumnDef::new(CmrDeliveries::Notes).text().null())
                        .col(
                            ColumnDef::new(CmrDeliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CmrDeliveries::UpdatedAt)
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
                        .name("idx_cmr_deliveries_user_ack")
                        .table(CmrDeliveries::Table)
                        .col(CmrDeliveries::UserId)
                        .col(CmrDeliveries::AckNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CmrDeliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CmrDeliveries {
        Table,
        Id,
        UserId,
        AckNumber,
        DeliveryDate,
        DestinationPool,
        Variety,
        CmrQuantityQtls,
        PaddyConsumedQtls,
        VehicleNumber,
        DriverName,
        DeliveryStatus,
        GateInStatus,
        GateInDate,
        DumpingStatus,
        DumpingDate,
        Season,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_ack_productions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_ack_productions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No unique key on (user_id, ack_number): duplicates are screened by the importer.
            manager
                .create_table(
                    Table::create()
                        .table(AckProductions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AckProductions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AckProductions::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(AckProductions::AckNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::ProductionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::RiceType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::FortifiedRiceQty)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::RawRiceQty)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::FrkQty)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AckProductions::Season).string().null())
                        .col(ColumnDef::new(AckProductions::Notes).text().null())
                        .col(
                            ColumnDef::new(AckProductions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AckProductions::UpdatedAt)
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
                        .name("idx_ack_productions_user_ack")
                        .table(AckProductions::Table)
                        .col(AckProductions::UserId)
                        .col(AckProductions::AckNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AckProductions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AckProductions {
        Table,
        Id,
        UserId,
        AckNumber,
        ProductionDate,
        RiceType,
        FortifiedRiceQty,
        RawRiceQty,
        FrkQty,
        Season,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_lorry_freight_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_lorry_freight_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LorryFreight::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LorryFreight::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LorryFreight::UserId).uuid().not_null())
                        .col(ColumnDef::new(LorryFreight::AckNumber).string().not_null())
                        .col(
                            ColumnDef::new(LorryFreight::VehicleNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LorryFreight::DeliveryDate).date().not_null())
                        .col(
                            ColumnDef::new(LorryFreight::TransporterName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::QuantityQtls)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::FreightRate)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::TotalFreight)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::AdvancePaid)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::BalanceDue)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(LorryFreight::Destination).string().not_null())
                        .col(ColumnDef::new(LorryFreight::Season).string().not_null())
                        .col(ColumnDef::new(LorryFreight::Notes).text().null())
                        .col(
                            ColumnDef::new(LorryFreight::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LorryFreight::UpdatedAt)
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
                        .name("idx_lorry_freight_user_ack")
                        .table(LorryFreight::Table)
                        .col(LorryFreight::UserId)
                        .col(LorryFreight::AckNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LorryFreight::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LorryFreight {
        Table,
        Id,
        UserId,
        AckNumber,
        VehicleNumber,
        DeliveryDate,
        TransporterName,
        QuantityQtls,
        FreightRate,
        TotalFreight,
        AdvancePaid,
        BalanceDue,
        PaymentStatus,
        Destination,
        Season,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}
