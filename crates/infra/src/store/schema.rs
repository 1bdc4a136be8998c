//! Postgres schema for the distribution store.
//!
//! Idempotent (`IF NOT EXISTS` throughout); applied at startup by
//! [`super::PostgresDistributionStore::init_schema`].

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS warehouses (
    id              BIGSERIAL PRIMARY KEY,
    total_capacity  DOUBLE PRECISION NOT NULL CHECK (total_capacity >= 0),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS products (
    id          BIGSERIAL PRIMARY KEY,
    volume_m3   DOUBLE PRECISION NOT NULL CHECK (volume_m3 >= 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS supplies (
    id            BIGSERIAL PRIMARY KEY,
    warehouse_id  BIGINT NOT NULL REFERENCES warehouses (id),
    status        TEXT NOT NULL CHECK (status IN ('RECEIVED', 'PROCESSED')),
    arrival_date  TIMESTAMPTZ,
    created_by    TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS supply_items (
    id          BIGSERIAL PRIMARY KEY,
    supply_id   BIGINT NOT NULL REFERENCES supplies (id),
    product_id  BIGINT NOT NULL REFERENCES products (id),
    quantity    INTEGER NOT NULL CHECK (quantity > 0)
);

CREATE TABLE IF NOT EXISTS shipments (
    id                BIGSERIAL PRIMARY KEY,
    request_id        UUID,
    source_id         BIGINT NOT NULL REFERENCES warehouses (id),
    destination_id    BIGINT NOT NULL REFERENCES warehouses (id),
    status            TEXT NOT NULL CHECK (status IN ('PLANNED', 'IN_TRANSIT', 'DELIVERED')),
    created_by        TEXT NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL,
    last_modified_by  TEXT NOT NULL,
    last_modified_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS shipment_items (
    id           BIGSERIAL PRIMARY KEY,
    shipment_id  BIGINT NOT NULL REFERENCES shipments (id),
    product_id   BIGINT NOT NULL REFERENCES products (id),
    quantity     INTEGER NOT NULL CHECK (quantity > 0)
);

CREATE TABLE IF NOT EXISTS plan_applications (
    request_id            UUID PRIMARY KEY,
    source_warehouse_id   BIGINT NOT NULL,
    supply_id             BIGINT,
    shipments_created     INTEGER NOT NULL DEFAULT 0,
    unallocated_recorded  INTEGER NOT NULL DEFAULT 0,
    applied_at            TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS unallocated_items (
    id           BIGSERIAL PRIMARY KEY,
    request_id   UUID NOT NULL,
    product_id   TEXT NOT NULL,
    volume_m3    DOUBLE PRECISION NOT NULL,
    reason       TEXT NOT NULL,
    recorded_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_shipments_destination_status ON shipments (destination_id, status);
CREATE INDEX IF NOT EXISTS idx_shipments_request ON shipments (request_id);
CREATE INDEX IF NOT EXISTS idx_shipment_items_shipment ON shipment_items (shipment_id);
CREATE INDEX IF NOT EXISTS idx_supplies_warehouse_status ON supplies (warehouse_id, status);
CREATE INDEX IF NOT EXISTS idx_supply_items_supply ON supply_items (supply_id);
CREATE INDEX IF NOT EXISTS idx_unallocated_items_request ON unallocated_items (request_id);
"#;
