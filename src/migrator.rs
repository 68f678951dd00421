use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_warehouses_table::Migration),
            Box::new(m20240101_000002_create_shelves_table::Migration),
            Box::new(m20240101_000003_create_manufacturers_table::Migration),
            Box::new(m20240101_000004_create_nomenclature_table::Migration),
            Box::new(m20240101_000005_create_items_table::Migration),
            Box::new(m20240101_000006_create_documents_table::Migration),
            Box::new(m20240101_000007_create_document_lines_table::Migration),
            Box::new(m20240101_000008_create_history_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_warehouses_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_warehouses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Address).string().null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Warehouses::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouses_name")
                        .table(Warehouses::Table)
                        .col(Warehouses::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Warehouses {
        Table,
        Id,
        Name,
        Address,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_shelves_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_shelves_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shelves::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shelves::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shelves::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Shelves::Code).string_len(50).not_null())
                        .col(ColumnDef::new(Shelves::Capacity).integer().null())
                        .col(
                            ColumnDef::new(Shelves::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Shelves::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Shelves::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            // Shelf codes are unique within their warehouse only
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shelves_warehouse_code")
                        .table(Shelves::Table)
                        .col(Shelves::WarehouseId)
                        .col(Shelves::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shelves::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Shelves {
        Table,
        Id,
        WarehouseId,
        Code,
        Capacity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_manufacturers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_manufacturers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Manufacturers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Manufacturers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Manufacturers::Name).string().not_null())
                        .col(ColumnDef::new(Manufacturers::Country).string().null())
                        .col(ColumnDef::new(Manufacturers::ContactInfo).string().null())
                        .col(
                            ColumnDef::new(Manufacturers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Manufacturers::UpdatedAt)
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
                        .name("idx_manufacturers_name")
                        .table(Manufacturers::Table)
                        .col(Manufacturers::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Manufacturers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Manufacturers {
        Table,
        Id,
        Name,
        Country,
        ContactInfo,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_nomenclature_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_nomenclature_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Nomenclature::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Nomenclature::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nomenclature::Article)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Nomenclature::Name).string().not_null())
                        .col(ColumnDef::new(Nomenclature::Unit).string_len(20).not_null())
                        .col(ColumnDef::new(Nomenclature::ManufacturerId).uuid().null())
                        .col(
                            ColumnDef::new(Nomenclature::MinStockLevel)
                                .decimal_len(10, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Nomenclature::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nomenclature::UpdatedAt)
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
                        .name("idx_nomenclature_article")
                        .table(Nomenclature::Table)
                        .col(Nomenclature::Article)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Nomenclature::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Nomenclature {
        Table,
        Id,
        Article,
        Name,
        Unit,
        ManufacturerId,
        MinStockLevel,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::NomenclatureId).uuid().not_null())
                        .col(ColumnDef::new(Items::BatchNumber).string_len(100).null())
                        .col(ColumnDef::new(Items::SerialNumber).string_len(100).null())
                        .col(
                            ColumnDef::new(Items::Quantity)
                                .decimal_len(10, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::PurchasePrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::SellingPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Items::CurrentShelfId).uuid().null())
                        .col(ColumnDef::new(Items::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Items::ManufactureDate).date().null())
                        .col(ColumnDef::new(Items::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(Items::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Items::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_nomenclature_status")
                        .table(Items::Table)
                        .col(Items::NomenclatureId)
                        .col(Items::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_current_shelf")
                        .table(Items::Table)
                        .col(Items::CurrentShelfId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Items {
        Table,
        Id,
        NomenclatureId,
        BatchNumber,
        SerialNumber,
        Quantity,
        PurchasePrice,
        SellingPrice,
        CurrentShelfId,
        Status,
        ManufactureDate,
        ExpiryDate,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_documents_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_documents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Documents::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Documents::DocumentType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Documents::DocumentNumber)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Documents::DocumentDate).date().not_null())
                        .col(ColumnDef::new(Documents::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Documents::Counterparty).string().null())
                        .col(
                            ColumnDef::new(Documents::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Documents::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Documents::Notes).text().null())
                        .col(
                            ColumnDef::new(Documents::CreatedBy)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Documents::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Documents::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_documents_number")
                        .table(Documents::Table)
                        .col(Documents::DocumentNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_documents_type_status_date")
                        .table(Documents::Table)
                        .col(Documents::DocumentType)
                        .col(Documents::Status)
                        .col(Documents::DocumentDate)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Documents {
        Table,
        Id,
        DocumentType,
        DocumentNumber,
        DocumentDate,
        WarehouseId,
        Counterparty,
        TotalAmount,
        Status,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000007_create_document_lines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_document_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentLines::DocumentId).uuid().not_null())
                        .col(
                            ColumnDef::new(DocumentLines::NomenclatureId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentLines::ItemId).uuid().null())
                        .col(
                            ColumnDef::new(DocumentLines::Quantity)
                                .decimal_len(10, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentLines::Price)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentLines::Total)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentLines::ShelfId).uuid().null())
                        .col(
                            ColumnDef::new(DocumentLines::SellingPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DocumentLines::BatchNumber)
                                .string_len(100)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DocumentLines::ManufactureDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(DocumentLines::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(DocumentLines::CreatedAt)
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
                        .name("idx_document_lines_document")
                        .table(DocumentLines::Table)
                        .col(DocumentLines::DocumentId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentLines::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum DocumentLines {
        Table,
        Id,
        DocumentId,
        NomenclatureId,
        ItemId,
        Quantity,
        Price,
        Total,
        ShelfId,
        SellingPrice,
        BatchNumber,
        ManufactureDate,
        ExpiryDate,
        CreatedAt,
    }
}

mod m20240101_000008_create_history_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key on ItemId: write-off rows must survive item
            // deletion when a receipt is cancelled.
            manager
                .create_table(
                    Table::create()
                        .table(History::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(History::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(History::ItemId).uuid().not_null())
                        .col(ColumnDef::new(History::DocumentId).uuid().null())
                        .col(
                            ColumnDef::new(History::OperationType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(History::QuantityChange)
                                .decimal_len(10, 3)
                                .null(),
                        )
                        .col(ColumnDef::new(History::Price).decimal_len(12, 2).null())
                        .col(ColumnDef::new(History::FromShelfId).uuid().null())
                        .col(ColumnDef::new(History::ToShelfId).uuid().null())
                        .col(ColumnDef::new(History::FromStatus).string_len(20).null())
                        .col(ColumnDef::new(History::ToStatus).string_len(20).null())
                        .col(
                            ColumnDef::new(History::OperationDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(History::CreatedBy).string_len(100).not_null())
                        .col(ColumnDef::new(History::Notes).text().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_history_item_date")
                        .table(History::Table)
                        .col(History::ItemId)
                        .col(History::OperationDate)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(History::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum History {
        Table,
        Id,
        ItemId,
        DocumentId,
        OperationType,
        QuantityChange,
        Price,
        FromShelfId,
        ToShelfId,
        FromStatus,
        ToStatus,
        OperationDate,
        CreatedBy,
        Notes,
    }
}
