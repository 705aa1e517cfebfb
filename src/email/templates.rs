use askama::Template;

#[derive(Template)]
#[template(path = "email/contact_notification.html")]
pub struct ContactNotification<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: Option<&'a str>,
    pub message: &'a str,
    pub admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact_receipt.html")]
pub struct ContactReceipt<'a> {
    pub name: &'a str,
}
