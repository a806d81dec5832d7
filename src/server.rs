use crate::api::TournamentDesk;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use std::sync::Arc;

/// thin composition layer over `TournamentDesk`: a representative slice of
/// routes, not the full request/response catalogue a production front end
/// would need.
pub async fn run(desk: Arc<TournamentDesk>, bind: &str) -> std::io::Result<()> {
    log::info!("binding tournament desk server on {bind}");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(desk.clone()))
            .route("/teams", web::get().to(teams))
            .route("/scores", web::get().to(scores))
            .route("/value", web::get().to(value))
            .route("/bracket", web::get().to(bracket_tree))
            .route("/game-importance", web::get().to(game_importance))
    })
    .bind(bind)?
    .run()
    .await
}

async fn teams(desk: web::Data<Arc<TournamentDesk>>) -> HttpResponse {
    HttpResponse::Ok().json(desk.teams().await)
}

async fn scores(desk: web::Data<Arc<TournamentDesk>>) -> HttpResponse {
    match desk.scores().await {
        Ok(scores) => HttpResponse::Ok().json(scores),
        Err(error) => HttpResponse::BadRequest().json(error.to_string()),
    }
}

async fn value(desk: web::Data<Arc<TournamentDesk>>) -> HttpResponse {
    match desk.value().await {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(error) => HttpResponse::InternalServerError().json(error.to_string()),
    }
}

async fn bracket_tree(desk: web::Data<Arc<TournamentDesk>>) -> HttpResponse {
    match desk.bracket_tree().await {
        Ok(tree) => HttpResponse::Ok().json(tree),
        Err(error) => HttpResponse::BadRequest().json(error.to_string()),
    }
}

async fn game_importance(desk: web::Data<Arc<TournamentDesk>>) -> HttpResponse {
    match desk.game_importance().await {
        Ok(games) => HttpResponse::Ok().json(games),
        Err(error) => HttpResponse::InternalServerError().json(error.to_string()),
    }
}
