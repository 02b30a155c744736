//! HTTP handlers and route configuration.

mod admin;
mod blog;
mod health;
mod views;

#[cfg(test)]
mod tests;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").route("/health", web::get().to(health::health_check)))
        // Admin API (bearer token)
        .service(
            web::scope("/admin")
                .route("/authors", web::post().to(admin::create_author))
                .route("/posts", web::get().to(admin::list_posts))
                .route("/posts", web::post().to(admin::create_post))
                .route("/posts/{id}", web::post().to(admin::update_post))
                .route("/posts/{id}", web::delete().to(admin::delete_post))
                .route("/comments", web::get().to(admin::list_comments))
                .route(
                    "/comments/{id}/moderation",
                    web::post().to(admin::moderate_comment),
                ),
        )
        // Public blog
        .service(
            web::scope("/blog")
                .service(
                    web::resource("")
                        .name("post_list")
                        .route(web::get().to(blog::post_list)),
                )
                .service(
                    web::resource("/tag/{tag}")
                        .name("post_list_by_tag")
                        .route(web::get().to(blog::post_list_by_tag)),
                )
                .service(
                    web::resource("/{year}/{month}/{day}/{slug}")
                        .name("post_detail")
                        .route(web::get().to(blog::post_detail)),
                )
                .service(
                    web::resource("/{id}/share")
                        .name("post_share")
                        .route(web::get().to(blog::post_share_form))
                        .route(web::post().to(blog::post_share)),
                )
                .service(
                    web::resource("/{id}/comment")
                        .name("post_comment")
                        .route(web::post().to(blog::post_comment))
                        .default_service(web::to(blog::method_not_allowed)),
                ),
        );
}
