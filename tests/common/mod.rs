#![allow(dead_code)]

use academy_backend::{AuthUser, Role};
use sqlx::PgPool;

pub async fn insert_user(pool: &PgPool, email: &str, role: &str, admin_id: Option<i32>) -> i32 {
    let hash = academy_backend::auth::hash_password("password123").unwrap();
    sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, full_name, role, admin_id) VALUES ($1, $2, $1, $3, $4) RETURNING id",
    )
    .bind(email)
    .bind(hash)
    .bind(role)
    .bind(admin_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn link_parent(pool: &PgPool, student_id: i32, parent_id: i32) {
    sqlx::query("INSERT INTO student_parents (student_id, parent_id) VALUES ($1, $2)")
        .bind(student_id)
        .bind(parent_id)
        .execute(pool)
        .await
        .unwrap();
}

pub fn admin(user_id: i32) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Admin,
        tenant_id: Some(user_id),
    }
}

pub fn developer(user_id: i32) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Developer,
        tenant_id: None,
    }
}

pub fn student(user_id: i32, admin_id: i32) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Student,
        tenant_id: Some(admin_id),
    }
}

pub fn parent(user_id: i32, admin_id: i32) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Parent,
        tenant_id: Some(admin_id),
    }
}

pub fn teacher(user_id: i32, admin_id: i32) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Teacher,
        tenant_id: Some(admin_id),
    }
}
