// Database schema definitions
diesel::table! {
    roles (role_id) {
        role_id -> Integer,
        role_name -> Text,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> Integer,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        password_hash -> Text,
        role_id -> Integer,
    }
}

diesel::table! {
    countries (country_id) {
        country_id -> Integer,
        country_name -> Text,
    }
}

diesel::table! {
    vacations (vacation_id) {
        vacation_id -> Integer,
        country_id -> Integer,
        destination -> Text,
        description -> Text,
        start_date -> Date,
        end_date -> Date,
        price -> Double,
        image_filename -> Text,
    }
}

diesel::table! {
    likes (user_id, vacation_id) {
        user_id -> Integer,
        vacation_id -> Integer,
    }
}

diesel::joinable!(users -> roles (role_id));
diesel::joinable!(vacations -> countries (country_id));
diesel::joinable!(likes -> users (user_id));
diesel::joinable!(likes -> vacations (vacation_id));

diesel::allow_tables_to_appear_in_same_query!(
    roles, users, countries, vacations, likes,
);
