diesel::table! {
    customers (customer_id) {
        customer_id -> Int4,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        phone_number -> Nullable<Text>,
        address -> Nullable<Text>,
        city -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    products (product_id) {
        product_id -> Int4,
        sale_id -> Nullable<Int4>,
        product_name -> Text,
        description -> Nullable<Text>,
        sku_number -> Nullable<Text>,
        category -> Nullable<Text>,
        price -> Numeric,
        stock_quantity -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    sales (sale_id) {
        sale_id -> Int4,
        product_id -> Nullable<Int4>,
        customer_id -> Nullable<Int4>,
        sale_date -> Timestamptz,
        quantity -> Int4,
        total_amount -> Numeric,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(sales -> products (product_id));
diesel::joinable!(sales -> customers (customer_id));

diesel::allow_tables_to_appear_in_same_query!(customers, products, sales,);
