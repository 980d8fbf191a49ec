use super::*;
use chrono::{Duration, Utc};
use shared::{
    domain::{HouseId, RequestSort, RequestStatus, RequestType, StaffStatus},
    paging::PageRequest,
};

fn first_page(limit: u32) -> PageRequest {
    PageRequest { page: 1, limit }
}

async fn resident_with_house(storage: &Storage, phone: &str, address: &str) -> (shared::domain::Resident, HouseId) {
    assert!(storage.create_user(phone, "hash").await.expect("user"));
    let resident = storage
        .create_resident(phone, "Ivan Petrov")
        .await
        .expect("resident")
        .expect("new resident");
    let house = storage
        .create_house(address)
        .await
        .expect("house")
        .expect("new house");
    storage
        .link_resident_house(&resident.id, house.id)
        .await
        .expect("link");
    (resident, house.id)
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("hoa.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn contains_pattern_escapes_wildcards() {
    assert_eq!(contains_pattern(None), None);
    assert_eq!(contains_pattern(Some("   ")), None);
    assert_eq!(contains_pattern(Some("Main")).as_deref(), Some("%main%"));
    assert_eq!(contains_pattern(Some("МОСГАЗ")).as_deref(), Some("%мосгаз%"));
    assert_eq!(contains_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
}

#[tokio::test]
async fn duplicate_phone_is_reported_not_raised() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.create_user("79990001122", "h1").await.expect("first"));
    assert!(!storage.create_user("79990001122", "h2").await.expect("second"));
    assert_eq!(
        storage.password_hash_for("79990001122").await.expect("hash").as_deref(),
        Some("h1")
    );
}

#[tokio::test]
async fn user_phones_are_filtered_and_paged() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for i in 0..15 {
        storage
            .create_user(&format!("700{i:07}"), "hash")
            .await
            .expect("user");
    }
    storage.create_user("80000000001", "hash").await.expect("user");

    let page = storage
        .list_user_phones(Some("700"), PageRequest { page: 2, limit: 10 })
        .await
        .expect("list");
    assert_eq!(page.total, 15);
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0], "7000000010");

    let all = storage.list_user_phones(None, first_page(100)).await.expect("list");
    assert_eq!(all.total, 16);
}

#[tokio::test]
async fn deleting_user_cascades_to_roles() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (resident, house) = resident_with_house(&storage, "70000000001", "Main St. 1").await;
    storage
        .create_staff_member("70000000001", "Ivan Petrov")
        .await
        .expect("staff")
        .expect("new staff");
    storage
        .create_request(&NewRequest {
            resident_id: resident.id.clone(),
            house_id: house,
            request_type: RequestType::HouseCommon,
            complaint: "Roof leak".into(),
            created_at: Utc::now(),
        })
        .await
        .expect("request");

    let removal = storage.delete_user("70000000001").await.expect("delete").expect("existed");
    assert_eq!(
        removal,
        UserRemoval {
            staff: true,
            resident: true
        }
    );
    assert!(storage.password_hash_for("70000000001").await.expect("hash").is_none());
    assert!(storage.resident_by_phone("70000000001").await.expect("lookup").is_none());
    assert!(storage.staff_member_by_phone("70000000001").await.expect("lookup").is_none());
    let left = storage
        .list_requests(&RequestFilter::default(), first_page(10))
        .await
        .expect("list");
    assert_eq!(left.total, 0);
    assert!(storage.delete_user("70000000001").await.expect("second delete").is_none());
}

#[tokio::test]
async fn house_addresses_are_unique() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage.create_house("Lenina 5").await.expect("house").expect("created");
    assert!(storage.create_house("Lenina 5").await.expect("dup").is_none());
    let second = storage.create_house("Lenina 7").await.expect("house").expect("created");

    assert_eq!(
        storage.rename_house(second.id, "Lenina 5").await.expect("rename"),
        HouseRename::AddressTaken
    );
    assert_eq!(
        storage.rename_house(HouseId(999), "Nowhere").await.expect("rename"),
        HouseRename::NotFound
    );
    assert_eq!(
        storage.rename_house(first.id, "Lenina 5a").await.expect("rename"),
        HouseRename::Renamed
    );

    let found = storage.list_houses(Some("5A"), first_page(10)).await.expect("list");
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].address, "Lenina 5a");
}

#[tokio::test]
async fn resident_house_links_are_idempotent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (resident, house) = resident_with_house(&storage, "70000000002", "Main St. 2").await;

    storage.link_resident_house(&resident.id, house).await.expect("relink");
    assert_eq!(storage.houses_for_resident(&resident.id).await.expect("houses").len(), 1);
    assert!(storage.resident_lives_in(&resident.id, house).await.expect("check"));

    assert!(storage.unlink_resident_house(&resident.id, house).await.expect("unlink"));
    assert!(!storage.unlink_resident_house(&resident.id, house).await.expect("unlink again"));
    assert!(!storage.resident_lives_in(&resident.id, house).await.expect("check"));
}

#[tokio::test]
async fn staff_members_start_active_and_can_be_removed() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.create_user("80000000001", "hash").await.expect("user");
    let member = storage
        .create_staff_member("80000000001", "Anna Sidorova")
        .await
        .expect("staff")
        .expect("created");
    assert_eq!(member.status, StaffStatus::Active);
    assert!(storage
        .create_staff_member("80000000001", "Someone Else")
        .await
        .expect("dup")
        .is_none());

    assert!(storage
        .set_staff_status(member.id, StaffStatus::Suspended)
        .await
        .expect("status"));
    let reloaded = storage.staff_member_by_id(member.id).await.expect("get").expect("exists");
    assert_eq!(reloaded.status, StaffStatus::Suspended);

    let spec = storage.create_specialization("Plumber").await.expect("spec");
    storage.assign_specialization(member.id, &spec.id).await.expect("assign");
    let removal = storage.delete_user("80000000001").await.expect("delete").expect("existed");
    assert!(removal.staff);
    assert!(!removal.resident);
    assert!(storage.staff_member_by_phone("80000000001").await.expect("lookup").is_none());
    assert!(storage.delete_user("80000000001").await.expect("delete again").is_none());
}

#[tokio::test]
async fn deactivated_specializations_are_hidden_and_can_return() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.create_user("80000000002", "hash").await.expect("user");
    let member = storage
        .create_staff_member("80000000002", "Oleg Ivanov")
        .await
        .expect("staff")
        .expect("created");
    let plumber = storage.create_specialization("Plumber").await.expect("spec");
    let roofer = storage.create_specialization("Roofer").await.expect("spec");

    storage.assign_specialization(member.id, &plumber.id).await.expect("assign");
    storage.assign_specialization(member.id, &roofer.id).await.expect("assign");
    assert!(storage.deactivate_specialization(member.id, &plumber.id).await.expect("deactivate"));
    assert!(!storage.deactivate_specialization(member.id, &plumber.id).await.expect("again"));

    let active = storage.active_specializations(member.id).await.expect("active");
    assert_eq!(active, vec![roofer.clone()]);

    storage.assign_specialization(member.id, &plumber.id).await.expect("reassign");
    assert_eq!(storage.active_specializations(member.id).await.expect("active").len(), 2);
}

#[tokio::test]
async fn least_busy_counts_assigned_requests_only() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (resident, house) = resident_with_house(&storage, "70000000003", "Main St. 3").await;
    let spec = storage.create_specialization("Electrician").await.expect("spec");

    let mut members = Vec::new();
    for i in 1..=3 {
        let phone = format!("8000000010{i}");
        storage.create_user(&phone, "hash").await.expect("user");
        let member = storage
            .create_staff_member(&phone, &format!("Worker {i}"))
            .await
            .expect("staff")
            .expect("created");
        storage.assign_specialization(member.id, &spec.id).await.expect("assign");
        members.push(member.id);
    }
    storage.deactivate_specialization(members[2], &spec.id).await.expect("deactivate");

    // first member: one assigned request; second member: one completed request
    for (member, status) in [(members[0], RequestStatus::Assigned), (members[1], RequestStatus::Completed)] {
        let request = storage
            .create_request(&NewRequest {
                resident_id: resident.id.clone(),
                house_id: house,
                request_type: RequestType::ApartmentInternal,
                complaint: "Socket sparks".into(),
                created_at: Utc::now(),
            })
            .await
            .expect("request");
        storage
            .update_request(&RequestUpdate {
                id: request.id,
                resident_id: resident.id.clone(),
                house_id: house,
                request_type: RequestType::ApartmentInternal,
                complaint: "Socket sparks".into(),
                cost: None,
                status,
                responsible_id: Some(member),
                organization_id: None,
            })
            .await
            .expect("update");
    }

    let chosen = storage.least_busy_staff_member(&spec.id).await.expect("lookup");
    assert_eq!(chosen, Some(members[1]));

    let nobody = storage
        .least_busy_staff_member(&"missing".into())
        .await
        .expect("lookup");
    assert_eq!(nobody, None);
}

#[tokio::test]
async fn request_filters_combine_and_sort() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (alice, alice_house) = resident_with_house(&storage, "70000000010", "Main St. 10").await;
    let (bob, bob_house) = resident_with_house(&storage, "70000000011", "Main St. 11").await;
    let base = Utc::now();

    let mut created = Vec::new();
    for (i, (resident, house, kind, complaint)) in [
        (&alice, alice_house, RequestType::ApartmentInternal, "Leaking tap"),
        (&alice, alice_house, RequestType::HouseCommon, "Broken elevator"),
        (&bob, bob_house, RequestType::HouseCommon, "Leaking roof"),
    ]
    .into_iter()
    .enumerate()
    {
        let request = storage
            .create_request(&NewRequest {
                resident_id: resident.id.clone(),
                house_id: house,
                request_type: kind,
                complaint: complaint.into(),
                created_at: base + Duration::minutes(i as i64),
            })
            .await
            .expect("request");
        created.push(request);
    }

    let newest_first = storage
        .list_requests(&RequestFilter::default(), first_page(10))
        .await
        .expect("list");
    assert_eq!(newest_first.total, 3);
    assert_eq!(newest_first.items[0].id, created[2].id);

    let oldest_first = storage
        .list_requests(
            &RequestFilter {
                sort: RequestSort::CreatedAsc,
                ..RequestFilter::default()
            },
            first_page(10),
        )
        .await
        .expect("list");
    assert_eq!(oldest_first.items[0].id, created[0].id);

    let leaking_common = storage
        .list_requests(
            &RequestFilter {
                complaint: Some("leaking".into()),
                request_type: Some(RequestType::HouseCommon),
                ..RequestFilter::default()
            },
            first_page(10),
        )
        .await
        .expect("list");
    assert_eq!(leaking_common.total, 1);
    assert_eq!(leaking_common.items[0].resident_id, bob.id);

    let alices = storage
        .list_requests(
            &RequestFilter {
                resident_phone: Some("70000000010".into()),
                ..RequestFilter::default()
            },
            PageRequest { page: 2, limit: 1 },
        )
        .await
        .expect("list");
    assert_eq!(alices.total, 2);
    assert_eq!(alices.items.len(), 1);
    assert_eq!(alices.items[0].id, created[0].id);
}

#[tokio::test]
async fn request_update_and_delete_report_missing_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (resident, house) = resident_with_house(&storage, "70000000020", "Main St. 20").await;
    let organization = storage.create_organization("Vodokanal").await.expect("org");

    let request = storage
        .create_request(&NewRequest {
            resident_id: resident.id.clone(),
            house_id: house,
            request_type: RequestType::HouseCommon,
            complaint: "No water".into(),
            created_at: Utc::now(),
        })
        .await
        .expect("request");
    assert_eq!(request.status, RequestStatus::Created);

    let update = RequestUpdate {
        id: request.id.clone(),
        resident_id: resident.id.clone(),
        house_id: house,
        request_type: RequestType::HouseCommon,
        complaint: "No water since Monday".into(),
        cost: Some(1500.5),
        status: RequestStatus::Transferred,
        responsible_id: None,
        organization_id: Some(organization.id.clone()),
    };
    assert!(storage.update_request(&update).await.expect("update"));

    let stored = storage.request_by_id(&request.id).await.expect("get").expect("exists");
    assert_eq!(stored.cost, Some(1500.5));
    assert_eq!(stored.status, RequestStatus::Transferred);
    assert_eq!(stored.organization_id, Some(organization.id));

    assert!(storage.delete_request(&request.id).await.expect("delete"));
    assert!(!storage.delete_request(&request.id).await.expect("delete again"));
    assert!(!storage.update_request(&update).await.expect("update missing"));
}

#[tokio::test]
async fn organizations_rename_and_list() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let org = storage.create_organization("Gorgaz").await.expect("org");
    storage.create_organization("Vodokanal").await.expect("org");

    assert!(storage.rename_organization(&org.id, "Mosgaz").await.expect("rename"));
    assert!(!storage
        .rename_organization(&"0".repeat(40).into(), "Ghost")
        .await
        .expect("rename missing"));

    let listed = storage.list_organizations(Some("gaz"), first_page(10)).await.expect("list");
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].name, "Mosgaz");
    assert_eq!(
        storage.organization_by_id(&org.id).await.expect("get").map(|o| o.name),
        Some("Mosgaz".to_string())
    );
}

#[tokio::test]
async fn pattern_filters_ignore_case_for_cyrillic_and_ascii() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");

    storage.create_organization("Мосгаз").await.expect("org");
    storage.create_organization("Mosgaz").await.expect("org");
    for needle in ["мосгаз", "МОСГАЗ", "мОсГаЗ"] {
        let found = storage.list_organizations(Some(needle), first_page(10)).await.expect("list");
        assert_eq!(found.total, 1, "needle {needle}");
        assert_eq!(found.items[0].name, "Мосгаз");
    }
    let ascii = storage.list_organizations(Some("MOSGAZ"), first_page(10)).await.expect("list");
    assert_eq!(ascii.total, 1);
    assert_eq!(ascii.items[0].name, "Mosgaz");

    storage.create_specialization("Сантехник").await.expect("spec");
    storage.create_specialization("Electrician").await.expect("spec");
    let plumbers = storage.list_specializations(Some("сАНТЕХ"), first_page(10)).await.expect("list");
    assert_eq!(plumbers.total, 1);
    let electricians = storage.list_specializations(Some("ELECTRIC"), first_page(10)).await.expect("list");
    assert_eq!(electricians.total, 1);

    let (resident, house) = resident_with_house(&storage, "70000000009", "ул. Ленина, 5").await;
    storage.create_house("Tverskaya 12").await.expect("house");
    let lenina = storage.list_houses(Some("ЛЕНИНА"), first_page(10)).await.expect("list");
    assert_eq!(lenina.total, 1);
    assert_eq!(lenina.items[0].address, "ул. Ленина, 5");
    let tverskaya = storage.list_houses(Some("tVERSKAYA"), first_page(10)).await.expect("list");
    assert_eq!(tverskaya.total, 1);

    for complaint in ["Протечка крыши", "Broken Lift"] {
        storage
            .create_request(&NewRequest {
                resident_id: resident.id.clone(),
                house_id: house,
                request_type: RequestType::HouseCommon,
                complaint: complaint.into(),
                created_at: Utc::now(),
            })
            .await
            .expect("request");
    }
    let leaks = storage
        .list_requests(
            &RequestFilter {
                complaint: Some("ПРОТЕЧКА".into()),
                ..RequestFilter::default()
            },
            first_page(10),
        )
        .await
        .expect("list");
    assert_eq!(leaks.total, 1);
    assert_eq!(leaks.items[0].complaint, "Протечка крыши");
    let lifts = storage
        .list_requests(
            &RequestFilter {
                complaint: Some("broken lift".into()),
                ..RequestFilter::default()
            },
            first_page(10),
        )
        .await
        .expect("list");
    assert_eq!(lifts.total, 1);
}

#[tokio::test]
async fn renames_and_updates_keep_search_in_step() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let org = storage.create_organization("Водоканал").await.expect("org");
    assert!(storage.rename_organization(&org.id, "Теплосеть").await.expect("rename"));
    let old = storage.list_organizations(Some("водоканал"), first_page(10)).await.expect("list");
    assert_eq!(old.total, 0);
    let new = storage.list_organizations(Some("ТЕПЛО"), first_page(10)).await.expect("list");
    assert_eq!(new.total, 1);

    let house = storage.create_house("Пушкина 1").await.expect("house").expect("created");
    assert_eq!(
        storage.rename_house(house.id, "Гоголя 2").await.expect("rename"),
        HouseRename::Renamed
    );
    let found = storage.list_houses(Some("гоголя"), first_page(10)).await.expect("list");
    assert_eq!(found.total, 1);
}

#[tokio::test]
async fn reopening_backfills_folded_columns() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("hoa.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    sqlx::query("INSERT INTO organizations (id, name) VALUES ('legacy', 'Жилсервис')")
        .execute(&storage.pool)
        .await
        .expect("raw insert");
    sqlx::query("INSERT INTO houses (address) VALUES ('Арбат 3')")
        .execute(&storage.pool)
        .await
        .expect("raw insert");
    let before = storage.list_organizations(Some("жилсервис"), first_page(10)).await.expect("list");
    assert_eq!(before.total, 0);
    drop(storage);

    let storage = Storage::new(&database_url).await.expect("reopen");
    let orgs = storage.list_organizations(Some("ЖИЛСЕРВИС"), first_page(10)).await.expect("list");
    assert_eq!(orgs.total, 1);
    let houses = storage.list_houses(Some("арбат"), first_page(10)).await.expect("list");
    assert_eq!(houses.total, 1);
}

#[tokio::test]
async fn concurrent_renames_onto_one_address_report_taken() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("hoa.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Storage::new(&database_url).await.expect("db");

    let first = storage.create_house("Sadovaya 1").await.expect("house").expect("created");
    let second = storage.create_house("Sadovaya 2").await.expect("house").expect("created");

    let (a, b) = tokio::join!(
        storage.rename_house(first.id, "Sadovaya 9"),
        storage.rename_house(second.id, "Sadovaya 9"),
    );
    let mut outcomes = vec![a.expect("first rename"), b.expect("second rename")];
    outcomes.sort_by_key(|outcome| *outcome == HouseRename::AddressTaken);
    assert_eq!(outcomes, vec![HouseRename::Renamed, HouseRename::AddressTaken]);
}

#[tokio::test]
async fn failed_user_delete_leaves_every_record_in_place() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let (resident, _house) = resident_with_house(&storage, "70000000011", "Main St. 11").await;
    storage
        .create_staff_member("70000000011", "Ivan Petrov")
        .await
        .expect("staff")
        .expect("new staff");
    sqlx::query(
        "CREATE TRIGGER keep_users BEFORE DELETE ON users
         BEGIN SELECT RAISE(ABORT, 'users are read-only'); END",
    )
    .execute(&storage.pool)
    .await
    .expect("trigger");

    storage.delete_user("70000000011").await.expect_err("aborted");

    assert!(storage.staff_member_by_phone("70000000011").await.expect("lookup").is_some());
    assert!(storage.resident_by_phone("70000000011").await.expect("lookup").is_some());
    assert_eq!(storage.houses_for_resident(&resident.id).await.expect("houses").len(), 1);
}
