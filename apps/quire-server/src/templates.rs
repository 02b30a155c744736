//! HTML templates, embedded at compile time.

use tera::Tera;

const TEMPLATES: &[(&str, &str)] = &[
    ("blog/base.html", include_str!("../templates/blog/base.html")),
    ("pagination.html", include_str!("../templates/pagination.html")),
    (
        "blog/post/includes/comment_form.html",
        include_str!("../templates/blog/post/includes/comment_form.html"),
    ),
    ("blog/post/list.html", include_str!("../templates/blog/post/list.html")),
    ("blog/post/detail.html", include_str!("../templates/blog/post/detail.html")),
    ("blog/post/share.html", include_str!("../templates/blog/post/share.html")),
    ("blog/post/comment.html", include_str!("../templates/blog/post/comment.html")),
];

/// Build the template registry. Names ending in `.html` are autoescaped.
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(tera)
}
