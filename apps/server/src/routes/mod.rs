use actix_web::web;

pub mod alerts;
pub mod checks;
pub mod cycle;
pub mod health;
pub mod sites;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_route)
        .service(cycle::run_cycle_route)
        .service(checks::user_checks_route)
        .service(checks::site_checks_route)
        .service(alerts::user_alerts_route)
        .service(sites::register_site_route);
}
