#[macro_use]
extern crate rocket;

mod config;
mod db;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

use dotenvy::dotenv;
use log::warn;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(422)]
fn unprocessable() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Failed to parse request data"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    if !config::Config::is_replicate_enabled() {
        warn!("replicate_api_token not configured; generation endpoints will fail");
    }

    println!("🚀 FaceMojo API running");
    println!("📚 Swagger UI → http://localhost:8000/api/docs");

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            routes![
                // Generation
                routes::generation::submit_generation,
                routes::generation::generation_status,
                routes::generation::wait_for_generation,
                // Usage
                routes::usage::check_eligibility,
                // Subscription
                routes::subscription::activate_subscription,
                routes::subscription::get_subscription_status,
                // Animations
                routes::animation::get_animation_history,
                // Admin
                routes::admin::reset_monthly_quota,
                routes::admin::set_quota,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![not_found, unprocessable, internal_error])
}
