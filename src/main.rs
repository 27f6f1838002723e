#[rocket::launch]
fn rocket() -> _ {
    auth_server::rocket()
}
